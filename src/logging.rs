//! Tracing setup for the `risk` binary.
//!
//! The filter comes from `RISK_LOG` (same syntax as `RUST_LOG`), default `warn`.
//! Line-oriented commands log to stderr. The TUI owns the terminal, so there
//! logs go to `risk.log` and only when `RISK_LOG` is set explicitly.

use std::fs::File;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::error::AppError;

pub const LOG_ENV: &str = "RISK_LOG";
pub const TUI_LOG_FILE: &str = "risk.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// `risk.log` in the working directory, truncated on start.
    TuiFile,
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber. Calling it twice is a no-op.
pub fn init(target: LogTarget) -> Result<(), AppError> {
    match target {
        LogTarget::Stderr => {
            let _ = tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter())
                .with_target(false)
                .try_init();
        }
        LogTarget::TuiFile => {
            if std::env::var_os(LOG_ENV).is_none() {
                return Ok(());
            }
            let file = File::create(TUI_LOG_FILE).map_err(|e| {
                AppError::new(4, format!("Failed to create log file '{TUI_LOG_FILE}': {e}"))
            })?;
            let _ = tracing_subscriber::fmt()
                .with_writer(Mutex::new(file))
                .with_env_filter(filter())
                .with_ansi(false)
                .try_init();
        }
    }
    Ok(())
}
