//! Logging initialization for the Pastibot client.
//!
//! Sets up `tracing` with an env-filter: `RUST_LOG` wins when set,
//! otherwise the configured default level applies.

use tracing_subscriber::EnvFilter;

/// Initialize the logging system.
///
/// Output is compact, human-readable, and goes to stderr so command
/// output on stdout stays machine-parseable.
///
/// # Arguments
///
/// * `level` - Default log level (trace, debug, info, warn, error)
pub fn init_logging(level: &str) {
    // Sanitize through parse_level so a typo degrades to info instead of
    // silently filtering everything out
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_level(level).to_string()));

    // try_init so repeated calls (e.g. in tests) are harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
