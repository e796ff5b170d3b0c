use std::str::FromStr;

use tracing::Level;

use crate::errors::{LedgerError, Result};

/// install a compact stdout subscriber for binaries and demos
pub fn init_logging(log_level: &str) -> Result<()> {
    let level = Level::from_str(log_level).map_err(|_| LedgerError::InvalidConfiguration {
        message: format!("unknown log level: {}", log_level),
    })?;

    tracing_subscriber::fmt()
        // source file and line of each event
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_max_level(level)
        .compact()
        .try_init()
        .map_err(|e| LedgerError::InvalidConfiguration {
            message: format!("logging already initialised: {}", e),
        })
}
