use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("plan identifier must not be blank")]
    BlankId,
    #[error("plan {plan_id} declared more than once")]
    DuplicatePlan { plan_id: String },
    #[error("plan {plan_id} must have a positive capacity")]
    ZeroCapacity { plan_id: String },
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
