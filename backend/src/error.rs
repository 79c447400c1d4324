use thiserror::Error;

/// Failure modes a Planning Service operation can raise directly (as opposed
/// to partial failure within a batch, which is reported through
/// `SchedulingResult` instead — see `planning::outcome`).
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("no slot available: {0}")]
    NoSlot(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
