pub mod error;
pub mod models;
pub mod query;
pub mod selection;
pub mod store;

pub use error::{RosterError, RosterResult, ValidationError};
pub use models::{
    NewStudent, PlanOccupancy, RosterStats, Student, StudentId, StudentPatch, StudentStatus,
};
pub use query::{PlanFilter, RosterQuery, StatusFilter};
pub use selection::SelectionTracker;
pub use store::RosterStore;
