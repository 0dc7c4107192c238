use std::fmt;

/// Reasons an operation on the message thread bridge was refused.
///
/// Usage-contract violations (wrong thread, blocking while holding the
/// dispatch lock) are reported through this type as well; they indicate a
/// programming error in the caller rather than a condition worth retrying.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// No thread has been designated as the message thread yet.
    #[error("message manager has not been initialized")]
    NotInitialized,

    /// Another manager in this process already owns the message thread.
    #[error("another message manager already owns the message thread")]
    AlreadyClaimed,

    /// A loop-control operation was invoked off the message thread.
    #[error("operation must be called from the message thread")]
    NotMessageThread,

    /// The calling thread holds the dispatch lock, so a blocking hand-off
    /// to the message thread could never complete.
    #[error("calling thread holds the dispatch lock; a blocking call would deadlock")]
    WouldDeadlock,

    /// Shutdown has started; new work is no longer accepted.
    #[error("message manager is shutting down")]
    ShuttingDown,

    /// The manager has fully stopped.
    #[error("message manager has stopped")]
    Stopped,

    /// Scheduled work was dropped by the native loop before it ran.
    #[error("scheduled work was dropped before it ran")]
    Abandoned,
}

/// A rejected post. The message is handed back to the caller untouched.
#[derive(thiserror::Error)]
#[error("message rejected: {reason}")]
pub struct PostError<M> {
    pub message: M,
    pub reason: BridgeError,
}

impl<M> PostError<M> {
    pub fn into_message(self) -> M {
        self.message
    }
}

impl<M> fmt::Debug for PostError<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostError")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}
