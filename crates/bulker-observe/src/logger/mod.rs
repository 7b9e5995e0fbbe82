//! Process-wide `tracing` setup for the bulker binary.
mod config;
mod error;
mod format;
mod log;

pub use config::{LOG_FORMAT_ENV, LOG_LEVEL_ENV, LoggerConfig};
pub use error::LoggerError;
pub use format::LoggerFormat;

/// Installs the global subscriber described by `cfg`. Call once, early in `main`.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    log::install(cfg)
}
