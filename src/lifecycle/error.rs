//! Errors raised by the signal manager.

use super::registry::BoxError;
use super::signals::LogicalSignal;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The signal cannot be delivered on this host.
    #[error("{signal} is not supported on this platform: {hint}")]
    UnsupportedSignal { signal: LogicalSignal, hint: String },

    /// `listen` was called while another `listen` is active.
    #[error("manager is already listening")]
    AlreadyRunning,

    /// Injection attempted while the manager is not waiting for a signal.
    #[error("manager is not listening")]
    NotListening,

    #[error("timed out injecting {0}: signal queue is full")]
    InjectTimeout(LogicalSignal),

    #[error("timed out waiting for the manager to listen")]
    ListenTimeout,

    /// The token passed to `listen` was cancelled before a signal arrived.
    #[error("listen cancelled")]
    Cancelled,

    #[error("{signal} handler #{index} failed: {source}")]
    Handler {
        signal: LogicalSignal,
        index: u64,
        #[source]
        source: BoxError,
    },

    #[error("shutdown step {step} of {total} failed: {source}")]
    ShutdownStep {
        step: usize,
        total: usize,
        #[source]
        source: BoxError,
    },

    #[error("reload step {step} of {total} failed: {source}")]
    ReloadStep {
        step: usize,
        total: usize,
        #[source]
        source: BoxError,
    },

    /// Double-tap escalation. Only observed when the exit hook returns.
    #[error("forced exit with code {code}")]
    ForcedExit { code: i32 },

    #[error("failed to register native signal delivery: {0}")]
    Native(#[from] std::io::Error),
}

impl Error {
    /// Whether a registered handler or chain step produced this error.
    pub fn is_handler_failure(&self) -> bool {
        matches!(
            self,
            Error::Handler { .. } | Error::ShutdownStep { .. } | Error::ReloadStep { .. }
        )
    }
}
