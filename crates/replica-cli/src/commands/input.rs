//! Shared input helpers for the offline commands.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use url::Url;

/// Read a file, or stdin when `path` is `-`.
pub fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading stdin")?;
        return Ok(buffer);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Parse the `--base-url` argument, adding `https://` when missing.
pub fn base_url(raw: &str) -> Result<Url> {
    replica_core::normalize_url(raw).with_context(|| format!("invalid --base-url '{raw}'"))
}
