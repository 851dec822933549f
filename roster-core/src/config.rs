use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use crate::catalog::{Plan, PlanId, PlanRegistry};
use crate::enrollment::{create_student, EnrollmentForm};
use crate::error::{ConfigError, Result};
use crate::roster::{RosterResult, RosterStore, Student, StudentStatus};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RosterConfig {
    pub system: SystemSection,
    pub plans: Vec<PlanSection>,
    #[serde(default)]
    pub students: Vec<SeedStudent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemSection {
    pub name: String,
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanSection {
    pub id: String,
    pub name: String,
    pub capacity: u32,
    #[serde(default)]
    pub price_label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedStudent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub plan_id: String,
    #[serde(default)]
    pub status: StudentStatus,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub enrolled_on: Option<NaiveDate>,
}

impl RosterConfig {
    pub fn registry(&self) -> Result<PlanRegistry> {
        let plans = self
            .plans
            .iter()
            .map(|section| {
                Plan::new(section.id.clone(), section.name.clone(), section.capacity)
                    .with_price_label(section.price_label.clone())
            })
            .collect();
        Ok(PlanRegistry::new(plans)?)
    }

    /// Builds the catalog and a store holding the seed students, each passed
    /// through the same checks as an interactive enrollment. Seeds without an
    /// explicit date are enrolled on `today`.
    pub fn build_store(&self, today: NaiveDate) -> Result<RosterStore> {
        let mut store = RosterStore::new(Arc::new(self.registry()?));
        for (index, seed) in self.students.iter().enumerate() {
            seed_student(&mut store, seed, today)
                .map_err(|source| ConfigError::Seed { index, source })?;
        }
        info!(
            target: "roster.config",
            system = %self.system.name,
            plans = self.plans.len(),
            students = store.len(),
            "roster seeded"
        );
        Ok(store)
    }
}

fn seed_student(
    store: &mut RosterStore,
    seed: &SeedStudent,
    today: NaiveDate,
) -> RosterResult<Student> {
    let form = EnrollmentForm {
        first_name: seed.first_name.clone(),
        last_name: seed.last_name.clone(),
        email: seed.email.clone(),
        plan_id: Some(PlanId::new(seed.plan_id.clone())),
    };
    let mut student = create_student(store, &form, seed.enrolled_on.unwrap_or(today))?;
    if seed.status != StudentStatus::Active {
        student = store.set_status(student.id, seed.status)?;
    }
    if seed.progress != 0 {
        student = store.set_progress(student.id, seed.progress)?;
    }
    Ok(student)
}

pub fn load_roster_config<P: AsRef<Path>>(path: P) -> Result<RosterConfig> {
    load_toml(path)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::catalog::CatalogError;
    use crate::roster::RosterError;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 1).unwrap()
    }

    #[test]
    fn load_fixture_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../configs/roster.toml");
        let config = load_roster_config(path).expect("fixture should parse");
        assert_eq!(config.system.name, "roster-primary");
        let store = config.build_store(today()).unwrap();
        assert_eq!(store.registry().len(), config.plans.len());
        assert_eq!(store.len(), config.students.len());
    }

    #[test]
    fn seed_over_capacity_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.toml");
        fs::write(
            &path,
            r#"
[system]
name = "test"
environment = "dev"

[[plans]]
id = "solo"
name = "Solo"
capacity = 1

[[students]]
first_name = "One"
last_name = "First"
email = "one@example.com"
plan_id = "solo"
status = "suspended"
progress = 30

[[students]]
first_name = "Two"
last_name = "Second"
email = "two@example.com"
plan_id = "solo"
"#,
        )
        .unwrap();

        let config = load_roster_config(&path).unwrap();
        assert_eq!(config.students[0].status, StudentStatus::Suspended);
        match config.build_store(today()) {
            Err(ConfigError::Seed { index, source }) => {
                assert_eq!(index, 1);
                assert!(matches!(source, RosterError::CapacityExceeded { .. }));
            }
            other => panic!("expected seed rejection, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_plans_are_a_config_error() {
        let config: RosterConfig = toml::from_str(
            r#"
[system]
name = "test"
environment = "dev"

[[plans]]
id = "basic"
name = "Basic"
capacity = 3

[[plans]]
id = "basic"
name = "Basic"
capacity = 4
"#,
        )
        .unwrap();
        assert!(matches!(
            config.registry(),
            Err(ConfigError::Catalog(CatalogError::DuplicatePlan { .. }))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_roster_config("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
