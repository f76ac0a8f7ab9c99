//! JSON output for command results.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// Serialize `value` to pretty-printed JSON with trailing newline.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    let mut payload = serde_json::to_string_pretty(value).context("serialize json")?;
    payload.push('\n');
    Ok(payload)
}

/// Write `value` to `path`, or to stdout when no path is given.
pub fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    let payload = to_json(value)?;
    match path {
        Some(path) => fs::write(path, payload).with_context(|| format!("write {}", path.display())),
        None => std::io::stdout()
            .lock()
            .write_all(payload.as_bytes())
            .context("write stdout"),
    }
}
