use std::fs;
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use roster_core::{
    load_roster_config, NewStudent, Notice, NoticeLevel, Notifier, PlanFilter, PlanId,
    RosterConfig, RosterEngine, RosterError, RosterSnapshot, RosterStats, StatusFilter, Student,
    StudentId, StudentPatch, StudentStatus,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] roster_core::ConfigError),
    #[error("{0}")]
    Roster(#[from] RosterError),
    #[error("io error reading {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Enrollment roster command-line interface", long_about = None)]
pub struct Cli {
    /// Path to roster.toml (plan catalog and seed students)
    #[arg(long, default_value = "configs/roster.toml")]
    pub config: PathBuf,
    /// Date used as "today" for new enrollments (YYYY-MM-DD)
    #[arg(long)]
    pub today: Option<NaiveDate>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Log debug output to stderr
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Roster totals and plan occupancy
    Status,
    /// Plan catalog operations
    #[command(subcommand)]
    Plan(PlanCommands),
    /// Student operations against the seeded roster
    #[command(subcommand)]
    Student(StudentCommands),
    /// Applies a JSON array of actions to the seeded roster in order
    Replay(ReplayArgs),
}

#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// Lists plans with their current occupancy
    List,
}

#[derive(Subcommand, Debug)]
pub enum StudentCommands {
    /// Lists students matching the filters
    List(StudentListArgs),
    /// Enrolls a new student
    Add(StudentAddArgs),
    /// Edits name, email or plan of a student
    Edit(StudentEditArgs),
    /// Deletes one or more students
    Delete(StudentDeleteArgs),
}

#[derive(Args, Debug, Default)]
pub struct StudentListArgs {
    /// Case-insensitive substring of first name, last name or email
    #[arg(long)]
    pub search: Option<String>,
    /// Status filter (active, inactive, suspended or all)
    #[arg(long)]
    pub status: Option<String>,
    /// Plan filter (plan id or all)
    #[arg(long)]
    pub plan: Option<String>,
}

#[derive(Args, Debug)]
pub struct StudentAddArgs {
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub plan: String,
}

#[derive(Args, Debug)]
pub struct StudentEditArgs {
    pub id: StudentId,
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub plan: Option<String>,
}

#[derive(Args, Debug)]
pub struct StudentDeleteArgs {
    #[arg(required = true)]
    pub ids: Vec<StudentId>,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// JSON file holding an array of actions
    pub path: PathBuf,
}

/// One step of a replay script.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Add {
        first_name: String,
        last_name: String,
        email: String,
        plan_id: String,
    },
    Update {
        id: StudentId,
        #[serde(default)]
        first_name: Option<String>,
        #[serde(default)]
        last_name: Option<String>,
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        plan_id: Option<String>,
    },
    Delete {
        id: StudentId,
    },
    DeleteMany {
        ids: Vec<StudentId>,
    },
    DeleteSelected,
    SetStatus {
        id: StudentId,
        status: StudentStatus,
    },
    SetProgress {
        id: StudentId,
        progress: u32,
    },
    Search {
        text: String,
    },
    FilterStatus {
        status: String,
    },
    FilterPlan {
        plan: String,
    },
    SelectAll {
        selected: bool,
    },
    Toggle {
        id: StudentId,
        included: bool,
    },
}

impl Action {
    fn label(&self) -> &'static str {
        match self {
            Action::Add { .. } => "add",
            Action::Update { .. } => "update",
            Action::Delete { .. } => "delete",
            Action::DeleteMany { .. } => "delete_many",
            Action::DeleteSelected => "delete_selected",
            Action::SetStatus { .. } => "set_status",
            Action::SetProgress { .. } => "set_progress",
            Action::Search { .. } => "search",
            Action::FilterStatus { .. } => "filter_status",
            Action::FilterPlan { .. } => "filter_plan",
            Action::SelectAll { .. } => "select_all",
            Action::Toggle { .. } => "toggle",
        }
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let context = AppContext::new(&cli)?;

    match &cli.command {
        Commands::Status => {
            let status = context.gather_status()?;
            render(&status, cli.format)?;
        }
        Commands::Plan(PlanCommands::List) => {
            let plans = context.plan_list()?;
            render(&plans, cli.format)?;
        }
        Commands::Student(StudentCommands::List(args)) => {
            let students = context.student_list(args)?;
            render(&students, cli.format)?;
        }
        Commands::Student(StudentCommands::Add(args)) => {
            let student = context.student_add(args)?;
            render(&student, cli.format)?;
        }
        Commands::Student(StudentCommands::Edit(args)) => {
            let student = context.student_edit(args)?;
            render(&student, cli.format)?;
        }
        Commands::Student(StudentCommands::Delete(args)) => {
            let result = context.student_delete(args)?;
            render(&result, cli.format)?;
        }
        Commands::Replay(args) => {
            let report = context.replay(args)?;
            render(&report, cli.format)?;
        }
    }

    Ok(())
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
            Ok(())
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

/// Forwards engine notices to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Success => info!(target: "rosterctl.notice", "{}", notice.message),
            NoticeLevel::Failure => warn!(target: "rosterctl.notice", "{}", notice.message),
        }
    }
}

#[derive(Debug)]
struct AppContext {
    config: RosterConfig,
    today: NaiveDate,
}

impl AppContext {
    fn new(cli: &Cli) -> Result<Self> {
        let config = load_roster_config(&cli.config)?;
        let today = cli.today.unwrap_or_else(|| Utc::now().date_naive());
        Ok(Self { config, today })
    }

    /// A fresh engine over the seeded roster. Nothing outlives the process.
    fn engine(&self) -> Result<RosterEngine> {
        let store = self.config.build_store(self.today)?;
        Ok(RosterEngine::new(store)
            .with_fixed_date(self.today)
            .with_notifier(Box::new(LogNotifier)))
    }

    fn gather_status(&self) -> Result<StatusReport> {
        let engine = self.engine()?;
        Ok(StatusReport {
            system: self.config.system.name.clone(),
            environment: self.config.system.environment.clone(),
            stats: engine.stats(),
        })
    }

    fn plan_list(&self) -> Result<PlanList> {
        let engine = self.engine()?;
        let stats = engine.stats();
        let rows = engine
            .list_plans()
            .iter()
            .zip(stats.plans)
            .map(|(plan, occupancy)| PlanEntry {
                plan_id: plan.id.clone(),
                name: plan.name.clone(),
                price_label: plan.price_label.clone(),
                capacity: plan.capacity,
                occupancy: occupancy.occupancy,
                available: occupancy.available,
            })
            .collect();
        Ok(PlanList { rows })
    }

    fn student_list(&self, args: &StudentListArgs) -> Result<StudentList> {
        let mut engine = self.engine()?;
        if let Some(search) = &args.search {
            engine.set_search_text(search.clone());
        }
        if let Some(status) = &args.status {
            engine.set_status_filter(status.parse::<StatusFilter>()?);
        }
        if let Some(plan) = &args.plan {
            engine.set_plan_filter(parse_plan_filter(plan));
        }
        let rows = engine.visible().into_iter().cloned().collect();
        Ok(StudentList { rows })
    }

    fn student_add(&self, args: &StudentAddArgs) -> Result<Student> {
        let mut engine = self.engine()?;
        let student = engine.add_student(NewStudent::new(
            args.first_name.clone(),
            args.last_name.clone(),
            args.email.clone(),
            args.plan.clone(),
        ))?;
        Ok(student)
    }

    fn student_edit(&self, args: &StudentEditArgs) -> Result<Student> {
        let mut engine = self.engine()?;
        let patch = StudentPatch {
            first_name: args.first_name.clone(),
            last_name: args.last_name.clone(),
            email: args.email.clone(),
            plan_id: args.plan.clone().map(PlanId::new),
        };
        Ok(engine.update_student(args.id, patch)?)
    }

    fn student_delete(&self, args: &StudentDeleteArgs) -> Result<DeleteResult> {
        let mut engine = self.engine()?;
        let removed = engine.delete_students(&args.ids);
        Ok(DeleteResult {
            requested: args.ids.len(),
            removed,
            remaining: engine.store().len(),
        })
    }

    fn replay(&self, args: &ReplayArgs) -> Result<ReplayReport> {
        let content = fs::read_to_string(&args.path).map_err(|source| AppError::Io {
            source,
            path: args.path.clone(),
        })?;
        let actions: Vec<Action> = serde_json::from_str(&content)?;
        let mut engine = self.engine()?;

        let steps = actions
            .iter()
            .enumerate()
            .map(|(index, action)| {
                let outcome = apply_action(&mut engine, action);
                ReplayStep {
                    index,
                    action: action.label().to_string(),
                    ok: outcome.is_ok(),
                    detail: outcome.unwrap_or_else(|err| err.to_string()),
                }
            })
            .collect();

        Ok(ReplayReport {
            steps,
            snapshot: engine.snapshot(),
            stats: engine.stats(),
        })
    }
}

fn parse_plan_filter(value: &str) -> PlanFilter {
    match value.parse() {
        Ok(filter) => filter,
        Err(never) => match never {},
    }
}

fn apply_action(
    engine: &mut RosterEngine,
    action: &Action,
) -> std::result::Result<String, RosterError> {
    let detail = match action {
        Action::Add {
            first_name,
            last_name,
            email,
            plan_id,
        } => {
            let student = engine.add_student(NewStudent::new(
                first_name.clone(),
                last_name.clone(),
                email.clone(),
                plan_id.clone(),
            ))?;
            format!("added #{} on {}", student.id, student.plan_id)
        }
        Action::Update {
            id,
            first_name,
            last_name,
            email,
            plan_id,
        } => {
            let patch = StudentPatch {
                first_name: first_name.clone(),
                last_name: last_name.clone(),
                email: email.clone(),
                plan_id: plan_id.clone().map(PlanId::new),
            };
            let student = engine.update_student(*id, patch)?;
            format!("updated #{}", student.id)
        }
        Action::Delete { id } => match engine.delete_student(*id) {
            Some(student) => format!("deleted #{}", student.id),
            None => format!("#{id} already absent"),
        },
        Action::DeleteMany { ids } => {
            let removed = engine.delete_students(ids);
            format!("deleted {removed} of {}", ids.len())
        }
        Action::DeleteSelected => {
            let removed = engine.delete_selected();
            format!("deleted {removed} selected")
        }
        Action::SetStatus { id, status } => {
            let student = engine.set_student_status(*id, *status)?;
            format!("#{} is {}", student.id, student.status)
        }
        Action::SetProgress { id, progress } => {
            let student = engine.set_student_progress(*id, *progress)?;
            format!("#{} at {}%", student.id, student.progress)
        }
        Action::Search { text } => {
            engine.set_search_text(text.clone());
            format!("{} visible", engine.visible().len())
        }
        Action::FilterStatus { status } => {
            engine.set_status_filter(status.parse()?);
            format!("{} visible", engine.visible().len())
        }
        Action::FilterPlan { plan } => {
            engine.set_plan_filter(parse_plan_filter(plan));
            format!("{} visible", engine.visible().len())
        }
        Action::SelectAll { selected } => {
            engine.select_all(*selected);
            format!("{} selected", engine.selected_ids().len())
        }
        Action::Toggle { id, included } => {
            engine.toggle_select(*id, *included);
            format!("{} selected", engine.selected_ids().len())
        }
    };
    Ok(detail)
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub system: String,
    pub environment: String,
    pub stats: RosterStats,
}

impl DisplayFallback for StatusReport {
    fn display(&self) -> String {
        let mut lines = vec![format!(
            "Roster: {} (env: {})",
            self.system, self.environment
        )];
        lines.push(format!("Students: {}", self.stats.total));
        for (status, count) in &self.stats.by_status {
            lines.push(format!("  - {status}: {count}"));
        }
        lines.push(format!(
            "Average progress: {:.1}%",
            self.stats.average_progress
        ));
        lines.push("Plans:".to_string());
        for plan in &self.stats.plans {
            lines.push(format!(
                "  - {}: {}/{} ({} free)",
                plan.plan_id, plan.occupancy, plan.capacity, plan.available
            ));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct PlanList {
    pub rows: Vec<PlanEntry>,
}

#[derive(Debug, Serialize)]
pub struct PlanEntry {
    pub plan_id: PlanId,
    pub name: String,
    pub price_label: String,
    pub capacity: u32,
    pub occupancy: usize,
    pub available: usize,
}

impl DisplayFallback for PlanList {
    fn display(&self) -> String {
        if self.rows.is_empty() {
            return "No plans configured".to_string();
        }
        self.rows
            .iter()
            .map(|entry| {
                format!(
                    "{} | {} | {} | {}/{} enrolled",
                    entry.plan_id, entry.name, entry.price_label, entry.occupancy, entry.capacity
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct StudentList {
    pub rows: Vec<Student>,
}

impl DisplayFallback for StudentList {
    fn display(&self) -> String {
        if self.rows.is_empty() {
            return "No students found".to_string();
        }
        self.rows
            .iter()
            .map(|student| student.display())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl DisplayFallback for Student {
    fn display(&self) -> String {
        format!(
            "#{} {} <{}> | plan={} | status={} | progress={}% | since {}",
            self.id,
            self.full_name(),
            self.email,
            self.plan_id,
            self.status,
            self.progress,
            self.enrolled_on
        )
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResult {
    pub requested: usize,
    pub removed: usize,
    pub remaining: usize,
}

impl DisplayFallback for DeleteResult {
    fn display(&self) -> String {
        format!(
            "Removed {} of {} requested ({} remaining)",
            self.removed, self.requested, self.remaining
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ReplayStep {
    pub index: usize,
    pub action: String,
    pub ok: bool,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<ReplayStep>,
    pub snapshot: RosterSnapshot,
    pub stats: RosterStats,
}

impl DisplayFallback for ReplayReport {
    fn display(&self) -> String {
        let mut lines: Vec<String> = self
            .steps
            .iter()
            .map(|step| {
                let mark = if step.ok { "OK" } else { "ERROR" };
                format!("[{mark}] #{} {}: {}", step.index, step.action, step.detail)
            })
            .collect();
        lines.push(format!(
            "Revision {}: {} visible, {} selected",
            self.snapshot.revision,
            self.snapshot.visible.len(),
            self.snapshot.selected.len()
        ));
        for student in &self.snapshot.visible {
            lines.push(format!("  {}", student.display()));
        }
        lines.join("\n")
    }
}
