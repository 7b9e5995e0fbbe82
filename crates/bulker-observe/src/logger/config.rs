use std::io::IsTerminal;

use crate::logger::{error::LoggerError, format::LoggerFormat};

/// Level directive, e.g. `debug` or `info,bulker_exec=trace`.
pub const LOG_LEVEL_ENV: &str = "BULKER_LOG";
/// One of `text`, `json`, `journald`.
pub const LOG_FORMAT_ENV: &str = "BULKER_LOG_FORMAT";

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let use_color = cfg!(test) || std::io::stderr().is_terminal();
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: false,
            use_color,
        }
    }
}

impl LoggerConfig {
    /// Defaults overridden by explicit values first, then by the environment.
    pub fn resolve(level: Option<&str>, format: Option<&str>) -> Result<Self, LoggerError> {
        let mut cfg = Self::default();

        let level = level
            .map(str::to_string)
            .or_else(|| std::env::var(LOG_LEVEL_ENV).ok());
        if let Some(level) = level.filter(|l| !l.trim().is_empty()) {
            cfg.level = level;
        }

        let format = format
            .map(str::to_string)
            .or_else(|| std::env::var(LOG_FORMAT_ENV).ok());
        if let Some(format) = format.filter(|f| !f.trim().is_empty()) {
            cfg.format = format.parse()?;
        }
        if cfg.format != LoggerFormat::Text {
            cfg.use_color = false;
        }
        Ok(cfg)
    }
}
