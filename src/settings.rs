use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use supabase_store::RemoteConfig;

pub const ENV_URL: &str = "PALMASTOUR_URL";
pub const ENV_API_KEY: &str = "PALMASTOUR_API_KEY";

/// How the id of a freshly created location is learned
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IdRecovery {
    /// Wait, re-fetch all locations and match by coordinates
    #[default]
    Scan,
    /// Ask the backend to echo the inserted row
    Representation,
}

/// Supabase project connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendSettings {
    pub url: String,
    pub api_key: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            connect_timeout_secs: 30,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureSettings {
    pub id_recovery: IdRecovery,
    /// Pause between location insert and the re-fetch in scan mode
    pub settle_delay_ms: u64,
    pub photo_description: String,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            id_recovery: IdRecovery::Scan,
            settle_delay_ms: 3000,
            photo_description: "Photo of location".to_string(),
        }
    }
}

/// Contents of `palmastour.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub backend: BackendSettings,
    pub capture: CaptureSettings,
}

impl AppSettings {
    /// Loads the settings file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            log::info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings: AppSettings = toml::from_str(&content)?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Loads the file, then applies environment overrides
    pub fn load_with_env(path: &Path) -> Result<Self, AppError> {
        let mut settings = Self::load(path)?;
        settings.apply_overrides(
            std::env::var(ENV_URL).ok(),
            std::env::var(ENV_API_KEY).ok(),
        );
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Non-empty values replace what the file says
    pub fn apply_overrides(&mut self, url: Option<String>, api_key: Option<String>) {
        if let Some(url) = url.filter(|v| !v.trim().is_empty()) {
            self.backend.url = url.trim().to_string();
        }
        if let Some(key) = api_key.filter(|v| !v.trim().is_empty()) {
            self.backend.api_key = key.trim().to_string();
        }
    }

    pub fn to_remote_config(&self) -> Result<RemoteConfig, AppError> {
        if self.backend.url.trim().is_empty() {
            return Err(AppError::Config(format!(
                "backend URL missing (set [backend] url or {})",
                ENV_URL
            )));
        }
        if self.backend.api_key.trim().is_empty() {
            return Err(AppError::Config(format!(
                "API key missing (set [backend] api_key or {})",
                ENV_API_KEY
            )));
        }
        let mut config = RemoteConfig::new(self.backend.url.trim(), self.backend.api_key.trim());
        config.connect_timeout_secs = self.backend.connect_timeout_secs;
        config.request_timeout_secs = self.backend.request_timeout_secs;
        Ok(config)
    }
}
