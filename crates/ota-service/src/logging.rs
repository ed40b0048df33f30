//! Structured logging setup

use tracing::info;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogSettings;
use crate::error::{ServiceError, ServiceResult};

/// Structured logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter, used when `RUST_LOG` is unset
    pub level: tracing::Level,
    /// Emit JSON lines instead of human-readable output
    pub json_format: bool,
    /// Include module targets in human-readable output
    pub include_targets: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            json_format: false,
            include_targets: true,
        }
    }
}

impl TryFrom<&LogSettings> for LoggingConfig {
    type Error = ServiceError;

    fn try_from(settings: &LogSettings) -> ServiceResult<Self> {
        let level = settings.level.parse().map_err(|_| {
            ServiceError::Config(format!("unknown log level '{}'", settings.level))
        })?;
        Ok(Self {
            level,
            json_format: settings.json,
            ..Self::default()
        })
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` overrides `config.level`. Fails if a subscriber is already
/// installed.
pub fn init_logging(config: LoggingConfig) -> ServiceResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let fmt_layer = if config.json_format {
        fmt::layer().json().with_current_span(true).boxed()
    } else {
        fmt::layer().with_target(config.include_targets).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| ServiceError::Config(format!("logging already initialised: {e}")))?;

    info!(
        level = %config.level,
        json = config.json_format,
        "Structured logging initialized"
    );
    Ok(())
}
