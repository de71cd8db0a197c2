use crate::types::JobId;
use crate::validation::FieldError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Validation failed: {0}")]
    Validation(#[from] FieldError),

    #[error("Conflict: {0}")]
    Conflict(String),
}
