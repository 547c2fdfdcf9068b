use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle};

/// Log level spec for the number of `-v` flags given.
pub fn level_for(verbosity: u64) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initializes logging to stderr. `RUST_LOG`, when set, wins over `-v`.
/// Keep the returned handle alive for as long as the process logs.
pub fn initialize(verbosity: u64) -> Result<LoggerHandle, FlexiLoggerError> {
    Logger::try_with_env_or_str(level_for(verbosity))?.start()
}
