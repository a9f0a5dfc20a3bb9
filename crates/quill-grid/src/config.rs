// Grid backend connection settings sourced from environment variables.
use crate::endpoints::ApiVersion;
use crate::error::ConfigError;
use std::time::Duration;

pub const DEFAULT_REFRESH_BUFFER_SECS: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Connection and credential settings for one grid backend installation.
///
/// The admin identity configured here is only ever exchanged for the
/// short-lived provisioning credential; it is never sent on ordinary calls.
#[derive(Debug, Clone)]
pub struct GridConfig {
    pub base_url: String,
    pub admin_email: String,
    pub admin_password: String,
    pub api_version: ApiVersion,
    /// Credentials are refreshed once their remaining lifetime drops below
    /// this buffer. Must be comfortably larger than one backend round trip.
    pub refresh_buffer: Duration,
    pub request_timeout: Duration,
}

impl GridConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = require_env("QUILL_GRID_URL")?;
        let admin_email = require_env("QUILL_GRID_ADMIN_EMAIL")?;
        let admin_password = require_env("QUILL_GRID_ADMIN_PASSWORD")?;
        let api_version = match std::env::var("QUILL_GRID_API_VERSION") {
            Ok(value) => value.parse()?,
            Err(_) => ApiVersion::V1,
        };
        let refresh_buffer = Duration::from_secs(read_secs_env(
            "QUILL_GRID_REFRESH_BUFFER_SECS",
            DEFAULT_REFRESH_BUFFER_SECS,
        )?);
        let request_timeout = Duration::from_secs(read_secs_env(
            "QUILL_GRID_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        let config = Self {
            base_url,
            admin_email,
            admin_password,
            api_version,
            refresh_buffer,
            request_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Re-check invariants on a config assembled by hand (tests, embedding).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Missing("QUILL_GRID_URL"));
        }
        if self.admin_email.trim().is_empty() {
            return Err(ConfigError::Missing("QUILL_GRID_ADMIN_EMAIL"));
        }
        if self.admin_password.is_empty() {
            return Err(ConfigError::Missing("QUILL_GRID_ADMIN_PASSWORD"));
        }
        if self.refresh_buffer.is_zero() {
            return Err(ConfigError::Invalid {
                key: "QUILL_GRID_REFRESH_BUFFER_SECS",
                detail: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn require_env(key: &'static str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn read_secs_env(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| ConfigError::Invalid {
                key,
                detail: format!("expected positive seconds, got {value:?}"),
            }),
        Err(_) => Ok(default),
    }
}
