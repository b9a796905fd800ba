//! Runtime settings handed to `Dashboard::open`.
//!
//! Hosts fill this in from their own surface (the CLI reads flags and
//! `LIFEDASH_*` variables through clap); the core never reads the
//! environment itself.

use crate::logging::{default_log_level, init_logging, LogLevel, LoggingError};
use std::path::PathBuf;

/// Resolved dashboard settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// SQLite file; `None` keeps the session in memory.
    pub db_path: Option<PathBuf>,
    pub log_level: LogLevel,
    /// Rolling log directory; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl DashboardConfig {
    /// Starts file logging when a directory is configured.
    ///
    /// Returns whether a logger is now running for this config.
    pub fn start_logging(&self) -> Result<bool, LoggingError> {
        let Some(log_dir) = &self.log_dir else {
            return Ok(false);
        };
        init_logging(self.log_level, log_dir)?;
        Ok(true)
    }
}
