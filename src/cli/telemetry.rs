use anyhow::{Result, anyhow};
use tracing::Level;

/// Map the `-v` count to a log level: warn, info, debug, then trace
#[must_use]
pub const fn level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global fmt subscriber writing to stderr, stdout carries reports
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(level: Level) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))
}
