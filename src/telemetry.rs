//! Console tracing setup.
//!
//! `RUST_LOG` overrides the configured level; the default filter scopes
//! logging to this crate so provider-internal spam stays out of transfer
//! logs.

use tracing_subscriber::Registry;
use tracing_subscriber::layer::{Layer, SubscriberExt};

use crate::config::LogLevel;

pub fn init(level: LogLevel) -> Result<(), TelemetryError> {
    let default_filter = format!("stablebridge={level}");

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter);
    let subscriber = Registry::default().with(fmt_layer);

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to set global subscriber")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}
