//! Tracing initialization for production nodes.

use tracing_subscriber::EnvFilter;

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Default filter directive when `RUST_LOG` is unset, e.g. `"info"`.
    pub default_filter: String,
    /// Emit compact single-line output instead of the full formatter.
    pub compact: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".into(),
            compact: false,
        }
    }
}

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG` when present. Safe to call once per process; later
/// calls are ignored.
pub fn init_telemetry(config: &TelemetryConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if config.compact {
        builder.compact().try_init()
    } else {
        builder.try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
