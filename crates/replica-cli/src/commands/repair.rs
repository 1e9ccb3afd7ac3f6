//! Offline document repair

use std::path::Path;

use anyhow::Result;
use replica_core::repair_document;
use tracing::debug;

use super::input::read_source;

/// Print the repaired form of the generated text in `file`.
pub fn execute(file: &Path) -> Result<()> {
    let raw = read_source(file)?;
    let outcome = repair_document(&raw);
    debug!(reparsed = outcome.reparsed, "Document repaired");
    println!("{}", outcome.document);
    Ok(())
}
