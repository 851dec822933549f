use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::PlanId;
use crate::roster::{
    NewStudent, RosterError, RosterResult, RosterStore, Student, StudentId, StudentPatch,
    ValidationError,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "student_id")]
pub enum WorkflowState {
    #[default]
    Idle,
    Creating,
    Editing(StudentId),
}

impl WorkflowState {
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Creating => "creating",
            WorkflowState::Editing(_) => "editing",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, WorkflowState::Idle)
    }
}

/// Editable fields of a student record as held by an open form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub plan_id: Option<PlanId>,
}

impl EnrollmentForm {
    pub fn from_student(student: &Student) -> Self {
        Self {
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            email: student.email.clone(),
            plan_id: Some(student.plan_id.clone()),
        }
    }

    pub fn from_new_student(input: NewStudent) -> Self {
        Self {
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            plan_id: Some(input.plan_id),
        }
    }

    pub fn apply_patch(&mut self, patch: StudentPatch) {
        if let Some(first_name) = patch.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            self.last_name = last_name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(plan_id) = patch.plan_id {
            self.plan_id = Some(plan_id);
        }
    }

    fn required_fields(&self) -> [(&'static str, &str); 3] {
        [
            ("first_name", self.first_name.as_str()),
            ("last_name", self.last_name.as_str()),
            ("email", self.email.as_str()),
        ]
    }
}

/// Runs the submit checks in order, stopping at the first failure:
/// required fields, plan selection, then plan capacity.
pub fn validate_submission(
    form: &EnrollmentForm,
    store: &RosterStore,
    excluding: Option<StudentId>,
) -> RosterResult<PlanId> {
    for (field, value) in form.required_fields() {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingRequiredField { field }.into());
        }
    }
    let plan_id = form
        .plan_id
        .as_ref()
        .filter(|plan_id| !plan_id.is_blank())
        .ok_or(ValidationError::MissingPlan)?;
    store.validate_capacity(plan_id, excluding)?;
    Ok(plan_id.clone())
}

pub fn create_student(
    store: &mut RosterStore,
    form: &EnrollmentForm,
    today: NaiveDate,
) -> RosterResult<Student> {
    let plan_id = validate_submission(form, store, None)?;
    store.add_on(
        NewStudent {
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            email: form.email.trim().to_string(),
            plan_id,
        },
        today,
    )
}

pub fn edit_student(
    store: &mut RosterStore,
    id: StudentId,
    form: &EnrollmentForm,
) -> RosterResult<Student> {
    if !store.contains(id) {
        return Err(RosterError::NotFound { student_id: id });
    }
    let plan_id = validate_submission(form, store, Some(id))?;
    store.update(
        id,
        StudentPatch {
            first_name: Some(form.first_name.trim().to_string()),
            last_name: Some(form.last_name.trim().to_string()),
            email: Some(form.email.trim().to_string()),
            plan_id: Some(plan_id),
        },
    )
}

/// Create/edit form state machine: `idle -> creating|editing -> idle`.
///
/// A failed submit keeps the state and the form so the caller can correct
/// and resubmit.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentWorkflow {
    state: WorkflowState,
    form: EnrollmentForm,
}

impl EnrollmentWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn form(&self) -> &EnrollmentForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> RosterResult<&mut EnrollmentForm> {
        self.require_open("edit the form")?;
        Ok(&mut self.form)
    }

    pub fn begin_create(&mut self) -> RosterResult<()> {
        self.require_idle("start creating")?;
        self.form = EnrollmentForm::default();
        self.state = WorkflowState::Creating;
        debug!(target: "roster.enrollment", "create form opened");
        Ok(())
    }

    pub fn begin_edit(&mut self, store: &RosterStore, id: StudentId) -> RosterResult<()> {
        self.require_idle("start editing")?;
        let student = store
            .get(id)
            .ok_or(RosterError::NotFound { student_id: id })?;
        self.form = EnrollmentForm::from_student(student);
        self.state = WorkflowState::Editing(id);
        debug!(target: "roster.enrollment", student_id = %id, "edit form opened");
        Ok(())
    }

    pub fn cancel(&mut self) {
        if !self.state.is_idle() {
            debug!(target: "roster.enrollment", state = self.state.label(), "form discarded");
        }
        self.reset();
    }

    pub fn submit(&mut self, store: &mut RosterStore) -> RosterResult<Student> {
        self.submit_on(store, Utc::now().date_naive())
    }

    pub fn submit_on(&mut self, store: &mut RosterStore, today: NaiveDate) -> RosterResult<Student> {
        let student = match self.state {
            WorkflowState::Idle => {
                return Err(RosterError::InvalidTransition {
                    state: self.state.label(),
                    action: "submit",
                })
            }
            WorkflowState::Creating => create_student(store, &self.form, today)?,
            WorkflowState::Editing(id) => edit_student(store, id, &self.form)?,
        };
        info!(
            target: "roster.enrollment",
            state = self.state.label(),
            student_id = %student.id,
            "form submitted"
        );
        self.reset();
        Ok(student)
    }

    fn reset(&mut self) {
        self.state = WorkflowState::Idle;
        self.form = EnrollmentForm::default();
    }

    fn require_idle(&self, action: &'static str) -> RosterResult<()> {
        if self.state.is_idle() {
            Ok(())
        } else {
            Err(RosterError::InvalidTransition {
                state: self.state.label(),
                action,
            })
        }
    }

    fn require_open(&self, action: &'static str) -> RosterResult<()> {
        if self.state.is_idle() {
            Err(RosterError::InvalidTransition {
                state: self.state.label(),
                action,
            })
        } else {
            Ok(())
        }
    }
}
