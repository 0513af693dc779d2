//! Bootstrap utilities for foodbank binaries.
//!
//! Shared initialization code for the scheduler and the purge CLI.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;

/// Initialize tracing with FOODBANK_LOG environment variable.
///
/// Defaults to "info" level if FOODBANK_LOG is not set. Logs go to stderr so
/// reports printed on stdout stay machine-readable.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
