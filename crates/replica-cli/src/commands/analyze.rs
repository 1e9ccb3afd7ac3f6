//! Offline page analysis

use std::path::Path;

use anyhow::Result;
use replica_core::{Config, analyze_page};

use super::input::{base_url, read_source};

/// Print the page analysis of `file` as pretty JSON.
pub fn execute(config: &Config, file: &Path, base: &str, fingerprint_only: bool) -> Result<()> {
    let html = read_source(file)?;
    let base = base_url(base)?;

    let analysis = analyze_page(&html, &base, &config.extraction);
    let rendered = if fingerprint_only {
        serde_json::to_string_pretty(&analysis.fingerprint)?
    } else {
        serde_json::to_string_pretty(&analysis)?
    };
    println!("{rendered}");
    Ok(())
}
