//! Offline prompt preview

use std::path::Path;

use anyhow::Result;
use replica_core::{Config, analyze_page, build_payload};
use tracing::info;

use super::input::{base_url, read_source};

/// Print the budgeted prompt (or the whole payload) for `file`.
pub fn execute(config: &Config, file: &Path, base: &str, json: bool) -> Result<()> {
    let html = read_source(file)?;
    let base = base_url(base)?;

    let analysis = analyze_page(&html, &base, &config.extraction);
    let payload = build_payload(base.as_str(), &html, &analysis, &config.budget);
    info!(
        prompt_chars = payload.prompt.chars().count(),
        budget = config.budget.max_prompt_chars,
        "Prompt composed"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{}", payload.prompt);
    }
    Ok(())
}
