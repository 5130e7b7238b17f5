//! Bootstrap configuration - seeds session state, then the session owns it.

use serde::{Deserialize, Serialize};

/// Initial values for a new recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Start time shown in the start-time input of a fresh session.
    /// Must be canonical `HH:MM:SS.mmm`; validated when the timer starts.
    #[serde(default = "TimerConfig::default_start_time")]
    pub default_start_time: String,

    /// Display poll interval in milliseconds.
    #[serde(default = "TimerConfig::default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

impl TimerConfig {
    fn default_start_time() -> String {
        "00:00:00.000".to_string()
    }

    fn default_refresh_interval_ms() -> u64 {
        10
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            default_start_time: Self::default_start_time(),
            refresh_interval_ms: Self::default_refresh_interval_ms(),
        }
    }
}

/// Who owns the records written by this process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    /// Storage scope for lectures and records.
    #[serde(default = "UserConfig::default_name")]
    pub name: String,
}

impl UserConfig {
    fn default_name() -> String {
        "guest".to_string()
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub timer: TimerConfig,

    #[serde(default)]
    pub user: UserConfig,
}
