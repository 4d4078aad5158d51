use thiserror::Error;

/// Failure taxonomy for the avatar core.
///
/// Unsupported commands and cancellations are recoverable and never crash the
/// frame loop; transport and stream errors abort the current operation only.
#[derive(Debug, Error)]
pub enum AvatarError {
    /// An animation key no layer function recognizes. Recovered as a no-op
    /// and surfaced to the caller for UI feedback.
    #[error("unsupported command: {0}")]
    MissingCapability(String),

    /// An explicit error record arrived in the autopilot stream.
    #[error("stream error: {0}")]
    Stream(String),

    /// HTTP failure (non-success status or network error).
    #[error("transport error: {0}")]
    Transport(String),

    /// Explicit abort. Distinguished from failure: produces no error status.
    #[error("cancelled")]
    Cancelled,

    /// Model or clip resource missing/malformed. Degrades to the primitive
    /// rig or a reduced clip set.
    #[error("asset error: {0}")]
    Asset(String),

    #[error("config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for AvatarError {
    fn from(err: reqwest::Error) -> Self {
        AvatarError::Transport(err.to_string())
    }
}
