//! Tracing subscriber setup shared by the binary and test helpers

use tracing_subscriber::EnvFilter;

/// Environment variable consulted before RUST_LOG
pub const LOG_ENV: &str = "CULICIDAE_LOG";

/// Build the filter from CULICIDAE_LOG, then RUST_LOG, then `default_level`
pub fn env_filter(default_level: &str) -> EnvFilter {
    if let Ok(level) = std::env::var(LOG_ENV) {
        if let Ok(filter) = EnvFilter::try_new(&level) {
            return filter;
        }
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global fmt subscriber. Both formats write to stderr; stdout
/// carries command output. Safe to call more than once; later calls are ignored.
pub fn init_logging(default_level: &str, json: bool) {
    let filter = env_filter(default_level);
    let result = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
