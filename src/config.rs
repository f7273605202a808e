//! Configuration Management
//!
//! Handles persistent configuration storage for azrm.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::arm::auth;
use crate::arm::environment::Environment;
use crate::error::{Error, Result};
use crate::lro::PollOptions;

/// How command output is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Default subscription ID
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub environment: Option<Environment>,
    #[serde(default)]
    pub output: Option<OutputFormat>,
    /// Delay between polls when the server suggests none
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    /// Give up waiting on long-running operations after this long
    #[serde(default)]
    pub poll_timeout_secs: Option<u64>,
    /// Extra resource type definitions for `id parse`
    #[serde(default)]
    pub resource_types_file: Option<PathBuf>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("azrm").join("config.json"))
    }

    /// Load configuration from disk, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring unreadable config: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("failed to create {}: {}", parent.display(), e)))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("failed to write {}: {}", path.display(), e)))?;

        Ok(())
    }

    /// Get effective subscription (CLI > config > Azure CLI default)
    pub fn effective_subscription(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.subscription_id.clone())
            .or_else(auth::get_default_subscription)
    }

    /// Get effective environment (CLI > config > public cloud)
    pub fn effective_environment(&self, cli: Option<Environment>) -> Environment {
        cli.or(self.environment).unwrap_or_default()
    }

    pub fn effective_output(&self, cli: Option<OutputFormat>) -> OutputFormat {
        cli.or(self.output).unwrap_or_default()
    }

    /// Poll options with the configured interval and timeout
    pub fn poll_options(&self, cli_timeout_secs: Option<u64>) -> PollOptions {
        let mut options = PollOptions::default();
        if let Some(secs) = self.poll_interval_secs {
            options.default_interval = Duration::from_secs(secs);
        }
        options.timeout = cli_timeout_secs
            .or(self.poll_timeout_secs)
            .map(Duration::from_secs);
        options
    }

    /// Set subscription and save
    /// Security: Validates subscription ID format before persisting
    pub fn set_subscription(&mut self, subscription_id: &str) -> Result<()> {
        if !auth::validate_subscription_id(subscription_id) {
            return Err(Error::Config(format!(
                "'{}' is not a valid subscription ID",
                subscription_id
            )));
        }
        self.subscription_id = Some(subscription_id.to_string());
        self.save()
    }

    /// Set environment and save
    pub fn set_environment(&mut self, environment: Environment) -> Result<()> {
        self.environment = Some(environment);
        self.save()
    }
}
