// Configuration management with layered configuration (file, env)

use crate::models::ReplacePolicy;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest page size for which "two entries or fewer" can only mean a final page
pub const MIN_PAGE_SIZE: u32 = 3;

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub console: ConsoleConfig,
    pub restore: RestoreConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub host: String,
    pub port: u16,
    pub director_name: String,
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_api_version")]
    pub api_version: u8,
}

fn default_api_version() -> u8 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreConfig {
    pub page_size: u32,
    #[serde(default = "default_true")]
    pub update_cache_on_open: bool,
    pub default_where: String,
    pub default_replace: ReplacePolicy,
    #[serde(default = "default_true")]
    pub merge_filesets: bool,
    #[serde(default = "default_true")]
    pub merge_jobs: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let defaults = Config::try_from(&Settings::default())?;

        let builder = Config::builder()
            // Built-in defaults so partial files are enough
            .add_source(defaults)
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                Environment::with_prefix("RESTORE")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if self.console.host.is_empty() {
            return Err("Console host cannot be empty".to_string());
        }
        if self.console.port == 0 {
            return Err("Console port must be greater than 0".to_string());
        }
        if self.console.connect_timeout_seconds == 0 {
            return Err("Console connect_timeout_seconds must be greater than 0".to_string());
        }

        if self.restore.page_size < MIN_PAGE_SIZE {
            return Err(format!(
                "Restore page_size must be at least {}",
                MIN_PAGE_SIZE
            ));
        }
        if self.restore.default_where.is_empty() {
            return Err("Restore default_where cannot be empty".to_string());
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            console: ConsoleConfig {
                host: "localhost".to_string(),
                port: 9101,
                director_name: "bareos-dir".to_string(),
                connect_timeout_seconds: 10,
                api_version: default_api_version(),
            },
            restore: RestoreConfig {
                page_size: 1000,
                update_cache_on_open: true,
                default_where: "/tmp/bareos-restores".to_string(),
                default_replace: ReplacePolicy::Never,
                merge_filesets: true,
                merge_jobs: true,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                json_logs: false,
            },
        }
    }
}
