//! Authoritative endpoint set for the grid backend.
//!
//! # Purpose
//! Resolves every grid operation to exactly one URL, chosen once from a
//! declared API version. There is no runtime probing of alternate paths; an
//! unknown version is a configuration error surfaced before any remote call.
use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Declared version of the grid backend API contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiVersion {
    #[default]
    V1,
}

impl FromStr for ApiVersion {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(ApiVersion::V1),
            other => Err(ConfigError::UnsupportedApiVersion(other.to_string())),
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiVersion::V1 => write!(f, "v1"),
        }
    }
}

/// Resolved URL set for one grid backend installation.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
    version: ApiVersion,
}

impl Endpoints {
    /// Resolve the endpoint set for `base_url` under a declared API version.
    pub fn for_version(base_url: &str, version: ApiVersion) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ConfigError::Missing("grid base url"));
        }
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "grid base url",
                detail: format!("expected http(s) url, got {base_url:?}"),
            });
        }
        Ok(Self {
            base: trimmed.to_string(),
            version,
        })
    }

    pub fn version(&self) -> ApiVersion {
        self.version
    }

    pub fn token_auth(&self) -> String {
        format!("{}/token-auth", self.base)
    }

    pub fn token_refresh(&self) -> String {
        format!("{}/token-refresh", self.base)
    }

    pub fn workspaces(&self) -> String {
        format!("{}/workspaces", self.base)
    }

    pub fn database_tokens(&self) -> String {
        format!("{}/database/tokens", self.base)
    }

    pub fn tables(&self) -> String {
        format!("{}/database/tables", self.base)
    }

    pub fn table(&self, table_id: u64) -> String {
        format!("{}/database/tables/{table_id}", self.base)
    }

    pub fn table_fields(&self, table_id: u64) -> String {
        format!("{}/database/fields/table/{table_id}", self.base)
    }
}
