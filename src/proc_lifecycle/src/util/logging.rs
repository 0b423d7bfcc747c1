//! Logging utilities

use std::sync::OnceLock;

/// Global flag for verbose logging
static VERBOSE_LOGGING: OnceLock<bool> = OnceLock::new();

/// Check if verbose logging is enabled
pub fn is_verbose() -> bool {
    VERBOSE_LOGGING.get().copied().unwrap_or(false)
}

/// Initialize the tracing subscriber.
///
/// Priority: RUST_LOG > --verbose (INFO) > default (WARN). Diagnostics go to
/// stderr so stdout carries only scenario output.
pub fn init_tracing(verbose: bool) {
    VERBOSE_LOGGING.set(verbose).ok();

    if std::env::var("RUST_LOG").is_ok() {
        // RUST_LOG env var takes precedence (for development/debugging)
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    } else {
        let level = if verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        };
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init();
    }
}
