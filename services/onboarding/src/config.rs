use anyhow::{Context, Result};
use quill_grid::GridConfig;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

// Onboarding service configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    /// Optional YAML file of tenant mappings provisioned by an earlier
    /// deployment, loaded into the registry at startup.
    pub mappings_file: Option<PathBuf>,
    pub grid: GridConfig,
}

#[derive(Debug, Deserialize)]
struct OnboardingConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    mappings_file: Option<PathBuf>,
}

impl OnboardingConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("QUILL_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse QUILL_BIND")?;
        let metrics_bind = std::env::var("QUILL_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:9090".to_string())
            .parse()
            .with_context(|| "parse QUILL_METRICS_BIND")?;
        let mappings_file = std::env::var("QUILL_MAPPINGS_FILE").ok().map(PathBuf::from);
        let grid = GridConfig::from_env().context("grid backend configuration")?;
        Ok(Self {
            bind_addr,
            metrics_bind,
            mappings_file,
            grid,
        })
    }

    /// Environment first, then a YAML override file named by `QUILL_CONFIG`.
    /// Grid credentials stay environment-only so they never land in a file.
    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("QUILL_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read QUILL_CONFIG: {path}"))?;
            let override_cfg: OnboardingConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse onboarding config yaml")?;
            if let Some(value) = override_cfg.bind_addr {
                config.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
            }
            if let Some(value) = override_cfg.metrics_bind {
                config.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
            }
            if let Some(value) = override_cfg.mappings_file {
                config.mappings_file = Some(value);
            }
        }
        Ok(config)
    }
}
