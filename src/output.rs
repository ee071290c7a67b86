//! Output formatting and persistence for responses.
//!
//! Responses are written as pretty-printed JSON to stdout or to a file.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

/// Logs a response using Rust's debug pretty-print format.
pub fn print_pretty<T: std::fmt::Debug>(response: &T) {
    debug!("{:#?}", response);
}

/// Serializes `response` as pretty JSON followed by a newline.
pub fn write_json<T: Serialize, W: Write>(mut writer: W, response: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, response)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes `response` to `path`, or to stdout when no path is given.
///
/// Parent directories are created as needed; an existing file is replaced.
pub fn emit<T: Serialize>(path: Option<&Path>, response: &T) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
            let file = fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            debug!(path = %path.display(), "Writing JSON response");
            write_json(io::BufWriter::new(file), response)
        }
        None => write_json(io::stdout().lock(), response),
    }
}
