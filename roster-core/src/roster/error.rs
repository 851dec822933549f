use thiserror::Error;

use crate::catalog::PlanId;

use super::models::StudentId;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingRequiredField { field: &'static str },
    #[error("missing plan")]
    MissingPlan,
}

/// Every variant is recoverable: the roster, selection and filters are left
/// exactly as they were before the failing call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("plan {plan_id} is full ({occupancy}/{capacity})")]
    CapacityExceeded {
        plan_id: PlanId,
        capacity: u32,
        occupancy: usize,
    },
    #[error("student {student_id} not found")]
    NotFound { student_id: StudentId },
    #[error("plan {plan_id} is not in the catalog")]
    UnknownPlan { plan_id: PlanId },
    #[error("progress must be within 0..=100, got {value}")]
    InvalidProgress { value: u32 },
    #[error("unknown student status: {0}")]
    InvalidStatus(String),
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
}

pub type RosterResult<T> = std::result::Result<T, RosterError>;
