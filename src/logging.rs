//! Logging setup for the binary.
//!
//! Diagnostics go to stderr so they never interleave with result tables or
//! JSON envelopes on stdout.

use tracing_subscriber::EnvFilter;

use crate::error::{LibraryError, Result};

/// Map `-q` / `-v` flags to a maximum level
///
/// quiet=ERROR, 0=WARN, 1=INFO, 2=DEBUG, 3+=TRACE
#[must_use]
pub const fn level_for(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::WARN,
        (false, 1) => tracing::Level::INFO,
        (false, 2) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}

/// Initializes structured logging based on verbosity level.
///
/// `RUST_LOG`, when set, takes precedence over the flags.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = level_for(verbose, quiet);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| LibraryError::config_error(format!("Failed to initialize logging: {e}")))?;

    Ok(())
}
