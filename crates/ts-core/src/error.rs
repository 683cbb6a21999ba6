use ts_events::EventError;

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while composing entities or running managers.
///
/// All of them are raised synchronously at the offending call and none are
/// worth retrying: the caller built an invalid configuration.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An argument was empty or otherwise unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A name or identity is already taken.
    #[error("duplicate name: {0}")]
    DuplicateName(String),

    /// A lookup found nothing, or found a value of a different type.
    #[error("not found: {0}")]
    NotFound(String),

    /// A required co-dependency or runtime condition is absent.
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    /// Event delivery failed while a manager was running.
    #[error(transparent)]
    Event(#[from] EventError),
}
