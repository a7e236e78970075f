//! Tracing setup for the host binary.
//!
//! Logs go to stderr so stdout carries only protocol lines. Every event in the crate
//! uses the `achroma_reader` target.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let result = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
    if result.is_ok() {
        tracing::debug!(target: "achroma_reader", filter, "logging initialised");
    }
}
