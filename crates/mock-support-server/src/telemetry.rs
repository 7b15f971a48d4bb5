//! Logging setup.

use crate::domain::error::ServerError;
use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive
    pub filter: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Load from `RUST_LOG` and `LOG_FORMAT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            filter: lookup("RUST_LOG")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            json: lookup("LOG_FORMAT").is_some_and(|v| v.trim().eq_ignore_ascii_case("json")),
        }
    }
}

/// Install the global subscriber. Fails if the filter is invalid or a
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), ServerError> {
    let env_filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| ServerError::Telemetry(e.to_string()))?;

    if config.json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| ServerError::Telemetry(e.to_string()))
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| ServerError::Telemetry(e.to_string()))
    }
}
