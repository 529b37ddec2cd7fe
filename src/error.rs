use std::fmt;
use supabase_store::RemoteError;

/// Central error type of the field capture app
#[derive(Debug)]
pub enum AppError {
    /// Backend call failed
    Remote(RemoteError),
    /// Settings file missing, unreadable or incomplete
    Config(String),
    /// Filesystem error
    Filesystem(std::io::Error),
    /// Validation error (e.g. invalid inputs)
    Validation(String),
    /// Resource not found
    NotFound(String),
    /// Background task panicked or was dropped before reporting
    Worker(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Remote(e) => write!(f, "Remote error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Filesystem(e) => write!(f, "Filesystem error: {}", e),
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Worker(msg) => write!(f, "Background task failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Remote(e) => Some(e),
            AppError::Filesystem(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RemoteError> for AppError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::NotFound(msg) => AppError::NotFound(msg),
            other => AppError::Remote(other),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Filesystem(e)
    }
}

impl From<toml::de::Error> for AppError {
    fn from(e: toml::de::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(e: toml::ser::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

/// One short notice per outcome, for the user-facing boundary
impl AppError {
    pub fn user_message(&self) -> String {
        match self {
            AppError::Remote(e) => match e {
                RemoteError::NoConnectivity => {
                    "No internet connection. Please connect and try again.".to_string()
                }
                RemoteError::InvalidId { .. } => "The record has an invalid identifier.".to_string(),
                RemoteError::FileUnavailable { path, .. } => {
                    format!("Photo file could not be read: {}", path.display())
                }
                RemoteError::Transport(_) => {
                    "The server could not be reached. Please try again.".to_string()
                }
                RemoteError::Status { status, .. } => {
                    format!("The server rejected the request (HTTP {}).", status)
                }
                RemoteError::Decode(_) => "The server sent an unexpected response.".to_string(),
                RemoteError::NotFound(msg) => format!("{} was not found.", msg),
                RemoteError::Config(_) => {
                    "Backend settings are incomplete. Please check URL and API key.".to_string()
                }
            },
            AppError::Config(_) => {
                "Backend settings are incomplete. Please check URL and API key.".to_string()
            }
            AppError::Filesystem(_) => {
                "Error accessing files. Please check app permissions.".to_string()
            }
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(msg) => format!("{} was not found.", msg),
            AppError::Worker(_) => "The operation was interrupted. Please try again.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_not_found_is_lifted() {
        let err: AppError = RemoteError::NotFound("photo 42".to_string()).into();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(err.user_message(), "photo 42 was not found.");
    }

    #[test]
    fn test_user_message_per_outcome() {
        let offline: AppError = RemoteError::NoConnectivity.into();
        assert!(offline.user_message().contains("No internet connection"));

        let rejected: AppError = RemoteError::Status {
            status: 401,
            body: "JWT expired".to_string(),
        }
        .into();
        assert_eq!(
            rejected.user_message(),
            "The server rejected the request (HTTP 401)."
        );

        let invalid = AppError::Validation("Latitude must be between -90 and 90".to_string());
        assert_eq!(invalid.user_message(), "Latitude must be between -90 and 90");
    }

    #[test]
    fn test_display_keeps_details() {
        let err: AppError = RemoteError::Decode("expected array".to_string()).into();
        assert_eq!(err.to_string(), "Remote error: Decode error: expected array");
    }
}
