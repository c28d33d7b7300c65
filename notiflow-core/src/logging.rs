//! Tracing setup shared by the CLI and the server.
//!
//! `RUST_LOG` wins over the level given here, e.g.
//! `RUST_LOG=notiflow_core=debug notiflow sync events exams.json`.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::{NotiflowError, NotiflowResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line output without timestamps, for interactive use.
    #[default]
    Compact,
    /// Full output with timestamps and targets, for the server.
    Full,
}

fn default_filter(level: Level) -> EnvFilter {
    EnvFilter::new(format!("notiflow={level},notiflow_core={level},notiflow_server={level}"))
}

/// Install the global subscriber. Call once, at startup.
pub fn init_tracing(level: Level, format: LogFormat) -> NotiflowResult<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level));

    let layer = match format {
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Full => fmt::layer().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .map_err(|e| NotiflowError::Config(format!("failed to set tracing subscriber: {e}")))
}
