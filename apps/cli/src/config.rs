//! CLI configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/direct-upload/config.toml`
//! - Windows: `%APPDATA%/direct-upload/config.toml`
//!
//! A missing file means defaults. Command-line flags override file values.

use std::path::{Path, PathBuf};

use anyhow::Context;
use direct_upload::UploaderConfig;
use serde::{Deserialize, Serialize};

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Descriptor endpoint used when `--presign-url` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presign_url: Option<String>,

    /// Token sent on presign requests when `--token` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default)]
    pub uploader: UploaderConfig,
}

impl CliConfig {
    /// Loads configuration from `path`, or from the platform default location.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path(),
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: CliConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata)
            .join("direct-upload")
            .join("config.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("direct-upload")
            .join("config.toml")
    }
}
