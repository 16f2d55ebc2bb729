//! Application Configuration Module
//!
//! Centralizes configuration for the rehearse service. Settings are loaded
//! from environment variables (with `.env` support for local development)
//! into a single struct passed through the application.

use secrecy::SecretString;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

/// Presence-channel settings, required only when presence mode is selected.
#[derive(Clone)]
pub struct PresenceSettings {
    pub api_url: String,
    pub ws_url: String,
    pub api_key: SecretString,
    pub avatar: String,
}

/// Holds all configuration loaded from the environment.
pub struct Config {
    pub interview_api_url: String,
    pub stt_api_url: String,
    pub presence_api_url: Option<String>,
    pub presence_ws_url: Option<String>,
    pub presence_api_key: Option<SecretString>,
    pub presence_avatar: String,
    /// Settle interval between media-ready and declaring presence usable.
    pub stabilization: Duration,
    /// Idle-recording advisory timeout.
    pub nudge_interval: Duration,
    pub data_dir: PathBuf,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `INTERVIEW_API_URL`: Base URL of the interview protocol server. Defaults to "http://localhost:8700".
    // *   `STT_API_URL`: Base URL of the speech-to-text service. Defaults to "http://localhost:8701".
    // *   `PRESENCE_API_URL` / `PRESENCE_WS_URL` / `PRESENCE_API_KEY`: Avatar service endpoints and key. Required only with --presence.
    // *   `PRESENCE_AVATAR`: (Optional) Avatar identity to render. Defaults to "ann_public".
    // *   `PRESENCE_STABILIZATION_MS`: (Optional) Settle delay after media-ready. Defaults to 2000.
    // *   `NUDGE_INTERVAL_SECS`: (Optional) Idle-recording advisory timeout. Defaults to 12.
    // *   `REHEARSE_DATA_DIR`: (Optional) Directory for setup and review snapshots. Defaults to ".rehearse".
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. Useful for local development, ignored if absent.
        dotenvy::dotenv().ok();

        let interview_api_url =
            env::var("INTERVIEW_API_URL").unwrap_or_else(|_| "http://localhost:8700".to_string());
        let stt_api_url =
            env::var("STT_API_URL").unwrap_or_else(|_| "http://localhost:8701".to_string());

        let presence_api_url = env::var("PRESENCE_API_URL").ok();
        let presence_ws_url = env::var("PRESENCE_WS_URL").ok();
        let presence_api_key = env::var("PRESENCE_API_KEY").ok().map(SecretString::from);
        let presence_avatar =
            env::var("PRESENCE_AVATAR").unwrap_or_else(|_| "ann_public".to_string());

        let stabilization =
            Duration::from_millis(env_u64("PRESENCE_STABILIZATION_MS", 2_000)?);
        let nudge_interval = Duration::from_secs(env_u64("NUDGE_INTERVAL_SECS", 12)?);

        let data_dir = PathBuf::from(
            env::var("REHEARSE_DATA_DIR").unwrap_or_else(|_| ".rehearse".to_string()),
        );

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            interview_api_url,
            stt_api_url,
            presence_api_url,
            presence_ws_url,
            presence_api_key,
            presence_avatar,
            stabilization,
            nudge_interval,
            data_dir,
            log_level,
        })
    }

    /// Validates that everything presence mode needs is present.
    pub fn presence(&self) -> Result<PresenceSettings, ConfigError> {
        let api_url = self
            .presence_api_url
            .clone()
            .ok_or_else(|| ConfigError::MissingVar("PRESENCE_API_URL".to_string()))?;
        let ws_url = self
            .presence_ws_url
            .clone()
            .ok_or_else(|| ConfigError::MissingVar("PRESENCE_WS_URL".to_string()))?;
        let api_key = self
            .presence_api_key
            .clone()
            .ok_or_else(|| ConfigError::MissingVar("PRESENCE_API_KEY".to_string()))?;
        Ok(PresenceSettings {
            api_url,
            ws_url,
            api_key,
            avatar: self.presence_avatar.clone(),
        })
    }
}

fn env_u64(key: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected an integer, got {value:?}"),
        }),
    }
}
