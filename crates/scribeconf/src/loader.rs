//! Config file discovery, loading, and environment variable overlay.

use crate::bootstrap::{TimerConfig, UserConfig};
use crate::infra::{PathsConfig, TelemetryConfig};
use crate::{BootstrapConfig, ConfigError, InfraConfig, ScribeConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/slidescribe/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("slidescribe/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("slidescribe.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load config from a TOML file.
pub fn load_from_file(path: &Path) -> Result<ScribeConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_toml(&contents, path)
}

/// Parse config from TOML string.
///
/// Unknown keys are ignored; known keys with the wrong type are errors.
pub(crate) fn parse_toml(contents: &str, path: &Path) -> Result<ScribeConfig, ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let type_error = |key: &str, expected: &str| ConfigError::Parse {
        path: path.to_path_buf(),
        message: format!("{} must be {}", key, expected),
    };

    let mut config = ScribeConfig::default();

    if let Some(paths) = table.get("paths").and_then(|v| v.as_table()) {
        if let Some(v) = paths.get("data_dir") {
            let s = v.as_str().ok_or_else(|| type_error("paths.data_dir", "a string"))?;
            config.infra.paths.data_dir = expand_path(s);
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level") {
            let s = v
                .as_str()
                .ok_or_else(|| type_error("telemetry.log_level", "a string"))?;
            config.infra.telemetry.log_level = s.to_string();
        }
    }

    if let Some(timer) = table.get("timer").and_then(|v| v.as_table()) {
        if let Some(v) = timer.get("default_start_time") {
            let s = v
                .as_str()
                .ok_or_else(|| type_error("timer.default_start_time", "a string"))?;
            config.bootstrap.timer.default_start_time = s.to_string();
        }
        if let Some(v) = timer.get("refresh_interval_ms") {
            let ms = v
                .as_integer()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| type_error("timer.refresh_interval_ms", "a positive integer"))?;
            config.bootstrap.timer.refresh_interval_ms = ms as u64;
        }
    }

    if let Some(user) = table.get("user").and_then(|v| v.as_table()) {
        if let Some(v) = user.get("name") {
            let s = v.as_str().ok_or_else(|| type_error("user.name", "a string"))?;
            config.bootstrap.user.name = s.to_string();
        }
    }

    Ok(config)
}

/// Merge two configs, with non-default values in `overlay` taking precedence.
pub fn merge_configs(base: ScribeConfig, overlay: ScribeConfig) -> ScribeConfig {
    fn pick<T: PartialEq>(base: T, overlay: T, default: T) -> T {
        if overlay != default {
            overlay
        } else {
            base
        }
    }

    let paths_default = PathsConfig::default();
    let telemetry_default = TelemetryConfig::default();
    let timer_default = TimerConfig::default();
    let user_default = UserConfig::default();

    ScribeConfig {
        infra: InfraConfig {
            paths: PathsConfig {
                data_dir: pick(
                    base.infra.paths.data_dir,
                    overlay.infra.paths.data_dir,
                    paths_default.data_dir,
                ),
            },
            telemetry: TelemetryConfig {
                log_level: pick(
                    base.infra.telemetry.log_level,
                    overlay.infra.telemetry.log_level,
                    telemetry_default.log_level,
                ),
            },
        },
        bootstrap: BootstrapConfig {
            timer: TimerConfig {
                default_start_time: pick(
                    base.bootstrap.timer.default_start_time,
                    overlay.bootstrap.timer.default_start_time,
                    timer_default.default_start_time,
                ),
                refresh_interval_ms: pick(
                    base.bootstrap.timer.refresh_interval_ms,
                    overlay.bootstrap.timer.refresh_interval_ms,
                    timer_default.refresh_interval_ms,
                ),
            },
            user: UserConfig {
                name: pick(
                    base.bootstrap.user.name,
                    overlay.bootstrap.user.name,
                    user_default.name,
                ),
            },
        },
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut ScribeConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Apply overrides from an arbitrary variable lookup.
pub fn apply_overrides_from<F>(config: &mut ScribeConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("SLIDESCRIBE_DATA_DIR") {
        config.infra.paths.data_dir = expand_path(&v);
        sources.env_overrides.push("SLIDESCRIBE_DATA_DIR".to_string());
    }

    if let Some(v) = lookup("SLIDESCRIBE_LOG_LEVEL") {
        config.infra.telemetry.log_level = v;
        sources.env_overrides.push("SLIDESCRIBE_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.infra.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }

    if let Some(v) = lookup("SLIDESCRIBE_START_TIME") {
        config.bootstrap.timer.default_start_time = v;
        sources.env_overrides.push("SLIDESCRIBE_START_TIME".to_string());
    }
    if let Some(v) = lookup("SLIDESCRIBE_REFRESH_MS") {
        if let Ok(ms) = v.parse::<u64>() {
            if ms > 0 {
                config.bootstrap.timer.refresh_interval_ms = ms;
                sources.env_overrides.push("SLIDESCRIBE_REFRESH_MS".to_string());
            }
        }
    }

    if let Some(v) = lookup("SLIDESCRIBE_USER") {
        config.bootstrap.user.name = v;
        sources.env_overrides.push("SLIDESCRIBE_USER".to_string());
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // Handle $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}
