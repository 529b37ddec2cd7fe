use std::path::PathBuf;

/// Result type for remote store operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors that can occur while talking to the backend
#[derive(Debug)]
pub enum RemoteError {
    /// No active network path; raised before any request is built
    NoConnectivity,
    /// An identifier is missing or not a UUID
    InvalidId { field: &'static str, value: String },
    /// Local file missing or unreadable
    FileUnavailable { path: PathBuf, source: std::io::Error },
    /// Request never produced a response (DNS, TLS, timeout, ...)
    Transport(reqwest::Error),
    /// Backend answered with a non-success status
    Status { status: u16, body: String },
    /// Response body was not the JSON we expected
    Decode(String),
    /// Lookup needed by a mutating call found nothing
    NotFound(String),
    /// Base URL or key unusable
    Config(String),
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::NoConnectivity => write!(f, "No network connection"),
            RemoteError::InvalidId { field, value } => {
                write!(f, "Invalid {}: '{}' is not a UUID", field, value)
            }
            RemoteError::FileUnavailable { path, source } => {
                write!(f, "File not readable: {} ({})", path.display(), source)
            }
            RemoteError::Transport(e) => write!(f, "Transport error: {}", e),
            RemoteError::Status { status, body } => {
                write!(f, "Backend returned {}: {}", status, body)
            }
            RemoteError::Decode(msg) => write!(f, "Decode error: {}", msg),
            RemoteError::NotFound(msg) => write!(f, "Not found: {}", msg),
            RemoteError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for RemoteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RemoteError::FileUnavailable { source, .. } => Some(source),
            RemoteError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Transport(err)
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Decode(err.to_string())
    }
}

impl RemoteError {
    pub(crate) fn invalid_id(field: &'static str, value: &str) -> Self {
        RemoteError::InvalidId {
            field,
            value: value.to_string(),
        }
    }

    /// True for failures raised locally, before anything went over the wire
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            RemoteError::NoConnectivity
                | RemoteError::InvalidId { .. }
                | RemoteError::FileUnavailable { .. }
                | RemoteError::Config(_)
        )
    }
}
