use crate::error::{RemoteError, RemoteResult};

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the backend
///
/// One static key serves as both `apikey` and bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteConfig {
    /// Project URL without trailing slash, e.g. `https://xyz.supabase.co`
    pub base_url: String,
    pub api_key: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Checks that URL and key are usable before any client is built
    pub fn validate(&self) -> RemoteResult<()> {
        if self.base_url.is_empty() {
            return Err(RemoteError::Config("backend URL is empty".to_string()));
        }
        if self.api_key.is_empty() {
            return Err(RemoteError::Config("API key is empty".to_string()));
        }
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| RemoteError::Config(format!("invalid backend URL: {}", e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(RemoteError::Config(format!(
                "unsupported URL scheme: {}",
                url.scheme()
            )));
        }
        Ok(())
    }

    /// `<base>/rest/v1/<table>`
    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// `<base>/storage/v1/object/`
    pub fn storage_object_prefix(&self) -> String {
        format!("{}/storage/v1/object/", self.base_url)
    }

    /// `<base>/storage/v1/object/public/`
    pub fn public_object_prefix(&self) -> String {
        format!("{}/storage/v1/object/public/", self.base_url)
    }

    /// Key shortened for log output
    pub fn redacted_key(&self) -> String {
        if self.api_key.chars().count() > 10 {
            format!("{}...", self.api_key.chars().take(10).collect::<String>())
        } else {
            "***".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_removed() {
        let config = RemoteConfig::new("https://demo.supabase.co/", "key");
        assert_eq!(config.base_url, "https://demo.supabase.co");
        assert_eq!(
            config.rest_url("locations"),
            "https://demo.supabase.co/rest/v1/locations"
        );
        assert_eq!(
            config.public_object_prefix(),
            "https://demo.supabase.co/storage/v1/object/public/"
        );
    }

    #[test]
    fn test_validate_rejects_empty_values() {
        assert!(RemoteConfig::new("", "key").validate().is_err());
        assert!(RemoteConfig::new("https://demo.supabase.co", "").validate().is_err());
        assert!(RemoteConfig::new("ftp://demo", "key").validate().is_err());
        assert!(RemoteConfig::new("https://demo.supabase.co", "key").validate().is_ok());
    }

    #[test]
    fn test_redacted_key() {
        let config = RemoteConfig::new("https://x", "eyJhbGciOiJIUzI1NiJ9.payload");
        assert_eq!(config.redacted_key(), "eyJhbGciOi...");
    }
}
