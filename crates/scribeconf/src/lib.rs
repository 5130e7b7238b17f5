//! Minimal configuration loading for Slide Scribe.
//!
//! # Configuration Philosophy
//!
//! - **Infrastructure** (`InfraConfig`): things that cannot change while a
//!   session runs - the data directory and log filter.
//!
//! - **Bootstrap** (`BootstrapConfig`): initial values that seed a recording
//!   session (default start time, display poll interval, storage user).
//!   After startup, the session is the source of truth.
//!
//! # Usage
//!
//! ```rust,no_run
//! use scribeconf::ScribeConfig;
//!
//! let config = ScribeConfig::load().expect("Failed to load config");
//! println!("Data dir: {}", config.infra.paths.data_dir.display());
//! println!("Start at: {}", config.bootstrap.timer.default_start_time);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/slidescribe/config.toml` (system)
//! 2. `~/.config/slidescribe/config.toml` (user)
//! 3. `./slidescribe.toml` (local override, or the `--config` path)
//! 4. Environment variables (`SLIDESCRIBE_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! data_dir = "~/.local/share/slidescribe"
//!
//! [telemetry]
//! log_level = "info"
//!
//! [timer]
//! default_start_time = "00:00:00.000"
//! refresh_interval_ms = 10
//!
//! [user]
//! name = "guest"
//! ```

pub mod bootstrap;
pub mod infra;
pub mod loader;

pub use bootstrap::{BootstrapConfig, TimerConfig, UserConfig};
pub use infra::{InfraConfig, PathsConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete Slide Scribe configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScribeConfig {
    #[serde(flatten)]
    pub infra: InfraConfig,

    #[serde(flatten)]
    pub bootstrap: BootstrapConfig,
}

impl ScribeConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = ScribeConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            let file_config = loader::load_from_file(&path)?;
            config = loader::merge_configs(config, file_config);
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        // Build TOML manually for nicer formatting
        let mut output = String::new();

        output.push_str("# Slide Scribe Configuration\n\n");

        output.push_str("[paths]\n");
        output.push_str(&format!(
            "data_dir = {}\n",
            quoted(&self.infra.paths.data_dir.display().to_string())
        ));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = {}\n",
            quoted(&self.infra.telemetry.log_level)
        ));

        output.push_str("\n[timer]\n");
        output.push_str(&format!(
            "default_start_time = {}\n",
            quoted(&self.bootstrap.timer.default_start_time)
        ));
        output.push_str(&format!(
            "refresh_interval_ms = {}\n",
            self.bootstrap.timer.refresh_interval_ms
        ));

        output.push_str("\n[user]\n");
        output.push_str(&format!("name = {}\n", quoted(&self.bootstrap.user.name)));

        output
    }
}

/// A TOML string literal for `value`, escaped as needed.
fn quoted(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}
