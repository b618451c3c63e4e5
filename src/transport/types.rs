// src/transport/types.rs
// Remote file model and transport error definitions

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Processing lifecycle of a remote file, as reported by the service.
///
/// Wire values are SCREAMING_SNAKE_CASE; anything unrecognized collapses to
/// `Unspecified` instead of failing deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Processing,
    Active,
    Failed,
    #[serde(other)]
    Unspecified,
}

impl std::fmt::Display for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FileState::Processing => "PROCESSING",
            FileState::Active => "ACTIVE",
            FileState::Failed => "FAILED",
            FileState::Unspecified => "STATE_UNSPECIFIED",
        };
        f.write_str(label)
    }
}

/// A server-side resource created from an uploaded payload.
///
/// Owned by the remote service; this system only observes it. `name`, `uri`
/// and `mime_type` are optional because the wire may omit them — the
/// orchestrator enforces presence before using the handle.
#[derive(Debug, Clone)]
pub struct RemoteFileHandle {
    pub name: Option<String>,
    pub uri: Option<String>,
    pub mime_type: Option<String>,
    pub state: FileState,
    pub error_message: Option<String>,
}

/// Transport errors with retry classification
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    TimeoutError,

    #[error("Authentication failed")]
    AuthenticationError,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Remote service error (HTTP {status}): {body}")]
    ServiceError { status: u16, body: String },

    #[error("Upload session response carried no session locator")]
    MissingSessionLocator,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Generation response contained no text")]
    EmptyGeneration,
}

impl TransportError {
    /// Returns true if a caller-level re-invocation of the whole run could
    /// plausibly succeed. The core itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::NetworkError(_)
                | TransportError::TimeoutError
                | TransportError::RateLimited
        )
    }
}
