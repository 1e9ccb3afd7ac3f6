//! Live page cloning

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use futures::StreamExt;
use replica_core::{
    CloneOptions, Config, GeminiGenerator, HttpPageFetcher, JobResult, JobStatus, Orchestrator,
    StatusEvent,
};
use tracing::info;

/// Arguments of the `clone` command.
#[derive(Debug, Clone)]
pub struct CloneArgs {
    pub url: String,
    pub output: Option<PathBuf>,
    pub options: Vec<(String, serde_json::Value)>,
    pub timeout: Option<u64>,
    pub json_events: bool,
    pub quiet: bool,
}

/// Run one clone job to completion, streaming its status to stderr.
pub async fn execute(config: &Config, args: CloneArgs) -> Result<()> {
    let fetcher = HttpPageFetcher::new(&config.fetch)?;
    let generator = GeminiGenerator::from_env(&config.generation)?;

    let mut orchestrator =
        Orchestrator::new(Arc::new(fetcher), Arc::new(generator), config.clone());
    if let Some(secs) = args.timeout {
        orchestrator = orchestrator.with_generation_timeout(Duration::from_secs(secs));
    }

    let options: CloneOptions = args.options.into_iter().collect();
    let (id, mut events) = orchestrator.submit_and_subscribe(&args.url, options).await?;
    info!(job_id = %id, "Clone job started");

    while let Some(event) = events.next().await {
        if args.json_events {
            eprintln!("{}", serde_json::to_string(&event)?);
        } else if !args.quiet {
            eprintln!("{}", render_event(&event));
        }
    }

    let job = orchestrator
        .get_status(id)
        .await
        .context("clone job disappeared")?;
    match job.result {
        Some(JobResult::Completed(output)) => {
            match &args.output {
                Some(path) => {
                    std::fs::write(path, output.document.as_str())
                        .with_context(|| format!("writing {}", path.display()))?;
                    if !args.quiet {
                        eprintln!("{} Wrote {}", "✓".green(), path.display());
                    }
                },
                None => println!("{}", output.document),
            }
            Ok(())
        },
        Some(JobResult::Failed { error }) => bail!("Clone failed: {error}"),
        None => bail!("Clone job ended without a result (status: {})", job.status),
    }
}

/// One human-readable status line.
fn render_event(event: &StatusEvent) -> String {
    let status = match event.status {
        JobStatus::Pending => event.status.as_str().dimmed(),
        JobStatus::Scraping | JobStatus::Cloning => event.status.as_str().cyan(),
        JobStatus::Completed => event.status.as_str().green(),
        JobStatus::Failed => event.status.as_str().red(),
    };
    let detail = event
        .error
        .as_deref()
        .or(event.message.as_deref())
        .unwrap_or_default();
    format!("{status:>9}  {}  {detail}", event.url)
        .trim_end()
        .to_string()
}
