//! # Structured Logging
//!
//! Log output goes to stderr so stdout stays clean for command output such
//! as `keygen` key material. Filtering follows `RUST_LOG` when set and
//! falls back to the node's defaults otherwise.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format, selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable output for local development.
    Pretty,
    /// JSON lines for log aggregation.
    Json,
}

/// Default filter directives when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "nostrgate_node=info,nostrgate_protocol=info,tower_http=debug";

/// Install the global tracing subscriber. Call once, before any spans open;
/// a second call panics.
pub fn init(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).init(),
    }

    tracing::debug!(?format, "logging initialized");
}
