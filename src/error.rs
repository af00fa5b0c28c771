use thiserror::Error;

/// Failure classes of the shim. None of these are fatal to the daemon;
/// every call site degrades to a logged boolean outcome.
#[derive(Debug, Error)]
pub enum ShimError {
    /// A system service refused us (usage access, notification post).
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The requested package is not installed or has no launch entry point.
    #[error("target unavailable: {0}")]
    TargetUnavailable(String),

    /// A shell command or removal poll exceeded its bound.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// The on-screen hierarchy had no node matching the keywords.
    #[error("no matching UI node for [{0}]")]
    TransientUiMiss(String),
}
