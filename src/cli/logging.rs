//! Logging initialization

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Initialize logging based on debug flag
///
/// Without `--debug` only warnings reach stderr. With it, everything from
/// `debug` up is written to a temp file whose path is returned, keeping
/// stdout and stderr clean for command output.
pub fn init_logging(debug: bool) -> Result<Option<PathBuf>> {
    if !debug {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_target(false)
            .init();
        return Ok(None);
    }

    // keep() detaches the file from cleanup so the log survives the process
    let (file, path) = tempfile::Builder::new()
        .prefix("kubeplorer-")
        .suffix(".log")
        .tempfile()
        .context("Failed to create debug log file")?
        .keep()
        .context("Failed to persist debug log file")?;

    tracing_subscriber::fmt()
        .with_writer(file)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    Ok(Some(path))
}
