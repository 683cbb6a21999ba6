/// Alias for `Result<T, EventError>`.
pub type EventResult<T> = Result<T, EventError>;

/// Failures surfaced by [`crate::EventService::update`].
///
/// Sending never fails; only delivery can.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// A listener reported an error. The rest of the drain was abandoned and
    /// undelivered invocations stay queued for the next drain.
    #[error("listener for {event} failed: {reason}")]
    ListenerFailed {
        /// Payload type name of the event whose listener failed.
        event: &'static str,
        /// The listener's error message.
        reason: String,
    },

    /// The configured flip cap was reached while invocations were still waiting.
    #[error("event drain stopped after {flips} flips with {pending} invocations still waiting")]
    DrainOverflow {
        /// Number of flips performed before giving up.
        flips: usize,
        /// Invocations left in the waiting queue.
        pending: usize,
    },
}
