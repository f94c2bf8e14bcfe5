//! Tracing setup
//!
//! Logs go to stderr; stdout carries JSON responses only.

use tracing_subscriber::EnvFilter;

/// Filter from RUST_LOG, else LOG_LEVEL, else `default_level`
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| match std::env::var("LOG_LEVEL") {
            Ok(level) if !level.is_empty() => EnvFilter::try_new(level),
            _ => EnvFilter::try_new(default_level),
        })
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber; later calls are ignored
pub fn init_tracing(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
