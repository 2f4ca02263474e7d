//! Runtime configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable that overrides [`LoggingConfig::filter`].
pub const LOG_ENV_VAR: &str = "TANDEM_LOG";

/// Top-level application configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub dispatch: DispatchConfig,
}

impl AppConfig {
    /// Parse a config from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// How observer callbacks are run during dispatch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Catch panics raised by callbacks and treat them as callback failures.
    pub isolate_panics: bool,

    /// Log a warning for callbacks that run longer than this.
    pub slow_callback_warn_ms: Option<u64>,
}

impl DispatchConfig {
    pub fn slow_callback_threshold(&self) -> Option<Duration> {
        self.slow_callback_warn_ms.map(Duration::from_millis)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            isolate_panics: true,
            slow_callback_warn_ms: Some(100),
        }
    }
}

/// Process-level logging setup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `"info"` or `"tandem=debug"`.
    pub filter: String,

    /// Colored output.
    pub ansi: bool,
}

impl LoggingConfig {
    /// The filter to install: the environment override if set, otherwise
    /// the configured one.
    pub fn effective_filter(&self) -> String {
        std::env::var(LOG_ENV_VAR)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| self.filter.clone())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            ansi: true,
        }
    }
}
