pub mod catalog;
pub mod config;
pub mod engine;
pub mod enrollment;
pub mod error;
pub mod roster;

pub use catalog::{CatalogError, CatalogResult, Plan, PlanId, PlanRegistry};
pub use config::{load_roster_config, PlanSection, RosterConfig, SeedStudent, SystemSection};
pub use engine::{Notice, NoticeLevel, Notifier, RosterEngine, RosterSnapshot};
pub use enrollment::{EnrollmentForm, EnrollmentWorkflow, WorkflowState};
pub use error::{ConfigError, Result};
pub use roster::{
    NewStudent, PlanFilter, PlanOccupancy, RosterError, RosterQuery, RosterResult, RosterStats,
    RosterStore, SelectionTracker, StatusFilter, Student, StudentId, StudentPatch, StudentStatus,
    ValidationError,
};
