pub mod error;
pub mod models;
pub mod registry;

pub use error::{CatalogError, CatalogResult};
pub use models::{Plan, PlanId};
pub use registry::PlanRegistry;
