pub mod workflow;

pub use workflow::{
    create_student, edit_student, validate_submission, EnrollmentForm, EnrollmentWorkflow,
    WorkflowState,
};
