//! Clone job orchestration.
//!
//! [`Orchestrator`] owns the job table and drives each submitted job through
//! `pending → scraping → cloning → completed | failed` on its own task:
//!
//! 1. fetch the page through the [`PageFetcher`];
//! 2. extract the structural fingerprint on the blocking pool;
//! 3. build the size-bounded generation payload;
//! 4. call the [`ContentGenerator`] under a time bound;
//! 5. repair the returned text into a [`GeneratedDocument`].
//!
//! Any failure ends the job as `failed` with a caller-facing message. Nothing
//! is retried.

use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, debug, info, info_span, instrument, warn};

use crate::budget::{GenerationPayload, build_payload};
use crate::bus::{NotificationBus, Subscription};
use crate::config::Config;
use crate::error::{Error, FetchError, GenerationError, Result};
use crate::extract::{PageAnalysis, analyze_page};
use crate::fetcher::{PageFetcher, normalize_url};
use crate::generator::ContentGenerator;
use crate::repair::repair_document;
use crate::store::JobStore;
use crate::types::{
    CloneJob, CloneMetadata, CloneOutput, GeneratedDocument, JobId, JobResult, JobStatus,
};

/// Caller-supplied options stored untouched on the job.
pub type CloneOptions = serde_json::Map<String, serde_json::Value>;

struct Inner {
    store: JobStore,
    fetcher: Arc<dyn PageFetcher>,
    generator: Arc<dyn ContentGenerator>,
    config: Config,
    generation_timeout: Duration,
}

/// Entry point for submitting and observing clone jobs.
///
/// Cheap to clone; clones share the same job table.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    /// Creates an orchestrator with an empty job table.
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        generator: Arc<dyn ContentGenerator>,
        config: Config,
    ) -> Self {
        let generation_timeout = config.generation.timeout();
        Self {
            inner: Arc::new(Inner {
                store: JobStore::new(NotificationBus::new()),
                fetcher,
                generator,
                config,
                generation_timeout,
            }),
        }
    }

    /// Overrides the generation time bound from the configuration.
    ///
    /// Only valid before the first submission.
    #[must_use]
    pub fn with_generation_timeout(self, timeout: Duration) -> Self {
        match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                inner.generation_timeout = timeout;
                Self {
                    inner: Arc::new(inner),
                }
            },
            Err(shared) => {
                warn!("Orchestrator already shared, keeping configured generation timeout");
                Self { inner: shared }
            },
        }
    }

    /// Submit `url` for cloning and start its pipeline.
    ///
    /// A URL without a scheme gets `https://`. Malformed URLs still create a
    /// job; it fails during `scraping`.
    pub async fn submit(&self, url: &str, options: CloneOptions) -> Result<JobId> {
        let job = CloneJob::new(display_url(url)?, options);
        let id = self.inner.store.insert(job).await;
        info!(job_id = %id, url, "Clone request submitted");
        self.spawn_pipeline(id);
        Ok(id)
    }

    /// Submit `url` and subscribe before the pipeline starts.
    ///
    /// The subscription sees every transition, starting with `pending`.
    pub async fn submit_and_subscribe(
        &self,
        url: &str,
        options: CloneOptions,
    ) -> Result<(JobId, Subscription)> {
        let job = CloneJob::new(display_url(url)?, options);
        let (id, subscription) = self.inner.store.insert_subscribed(job).await;
        info!(job_id = %id, url, "Clone request submitted");
        self.spawn_pipeline(id);
        Ok((id, subscription))
    }

    /// Snapshot of a job, if it exists.
    pub async fn get_status(&self, id: JobId) -> Option<CloneJob> {
        self.inner.store.get(id).await
    }

    /// The repaired document of a completed job.
    ///
    /// Fails with [`Error::NotFound`] for unknown ids and [`Error::Conflict`]
    /// for jobs that have not completed.
    pub async fn get_document(&self, id: JobId) -> Result<GeneratedDocument> {
        let job = self
            .inner
            .store
            .get(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("Clone request {id} not found")))?;
        match job.document() {
            Some(document) if job.status == JobStatus::Completed => Ok(document.clone()),
            _ => Err(Error::Conflict { status: job.status }),
        }
    }

    /// Follow status events of an existing job, starting with its snapshot.
    pub async fn subscribe(&self, id: JobId) -> Result<Subscription> {
        self.inner
            .store
            .subscribe(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("Clone request {id} not found")))
    }

    /// Number of jobs tracked since startup.
    pub async fn job_count(&self) -> usize {
        self.inner.store.len().await
    }

    /// Notification bus, exposed for subscriber accounting.
    #[must_use]
    pub fn bus(&self) -> &NotificationBus {
        self.inner.store.bus()
    }

    fn spawn_pipeline(&self, id: JobId) {
        let inner = Arc::clone(&self.inner);
        // The outer task turns a panicking pipeline into a failed job.
        tokio::spawn(
            async move {
                let worker = tokio::spawn(run_pipeline(Arc::clone(&inner), id));
                if let Err(err) = worker.await {
                    warn!(job_id = %id, error = %err, "Clone pipeline task aborted");
                    inner
                        .store
                        .finish(
                            id,
                            JobResult::Failed {
                                error: format!("Clone pipeline crashed: {err}"),
                            },
                        )
                        .await;
                }
            }
            .instrument(info_span!("clone_job", job_id = %id)),
        );
    }
}

/// Stored form of a submitted URL: normalized when possible, raw otherwise.
fn display_url(raw: &str) -> Result<String> {
    if raw.trim().is_empty() {
        return Err(Error::InvalidUrl("URL is required".to_string()));
    }
    Ok(normalize_url(raw).map_or_else(|_| raw.trim().to_string(), String::from))
}

#[instrument(skip(inner), fields(job_id = %id))]
async fn run_pipeline(inner: Arc<Inner>, id: JobId) {
    let result = match execute(&inner, id).await {
        Ok(output) => JobResult::Completed(output),
        Err(err) => {
            warn!(category = err.category(), error = %err, "Clone failed");
            JobResult::Failed {
                error: err.to_string(),
            }
        },
    };
    inner.store.finish(id, result).await;
}

async fn execute(inner: &Inner, id: JobId) -> Result<CloneOutput> {
    let job = inner
        .store
        .get(id)
        .await
        .ok_or_else(|| Error::NotFound(format!("Clone request {id} not found")))?;

    inner
        .store
        .advance(id, JobStatus::Scraping, "Scraping website content")
        .await;
    let target = normalize_url(&job.url)?;
    let snapshot = inner.fetcher.fetch(&target).await?;
    if snapshot.html.trim().is_empty() {
        return Err(FetchError::EmptyContent(target.to_string()).into());
    }
    debug!(bytes = snapshot.html.len(), "Page fetched");

    let html = Arc::new(snapshot.html);
    let analysis = {
        let html = Arc::clone(&html);
        let base = target.clone();
        let extraction = inner.config.extraction;
        tokio::task::spawn_blocking(move || analyze_page(&html, &base, &extraction))
            .await
            .map_err(|err| Error::Other(format!("Extraction task failed: {err}")))?
    };

    inner
        .store
        .advance(id, JobStatus::Cloning, "Generating clone")
        .await;
    let payload = budget(inner, &target, html, &analysis).await?;
    debug!(prompt_chars = payload.prompt.chars().count(), "Payload built");

    let draft = generate(inner, &payload.prompt).await?;
    let outcome = tokio::task::spawn_blocking(move || repair_document(&draft))
        .await
        .map_err(|err| Error::Other(format!("Repair task failed: {err}")))?;
    if !outcome.reparsed {
        debug!("Document kept without re-serialization");
    }

    Ok(CloneOutput {
        document: outcome.document,
        metadata: CloneMetadata {
            original_url: target.to_string(),
            generator: inner.generator.name().to_string(),
            fingerprint_summary: analysis.fingerprint.summary(),
        },
    })
}

async fn budget(
    inner: &Inner,
    target: &url::Url,
    html: Arc<String>,
    analysis: &PageAnalysis,
) -> Result<GenerationPayload> {
    let url = target.to_string();
    let analysis = analysis.clone();
    let config = inner.config.budget;
    tokio::task::spawn_blocking(move || build_payload(&url, &html, &analysis, &config))
        .await
        .map_err(|err| Error::Other(format!("Payload task failed: {err}")))
}

async fn generate(inner: &Inner, prompt: &str) -> Result<String> {
    let bound = inner.generation_timeout;
    match tokio::time::timeout(bound, inner.generator.generate(prompt)).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(err)) => Err(err.into()),
        Err(_) => Err(GenerationError::Timeout(bound).into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::fetcher::PageSnapshot;
    use async_trait::async_trait;
    use url::Url;

    struct StaticFetcher;

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, _url: &Url) -> std::result::Result<PageSnapshot, FetchError> {
            Ok(PageSnapshot {
                html: "<html><body><h1>Hi</h1></body></html>".to_string(),
                screenshot: None,
            })
        }
    }

    struct EchoGenerator;

    #[async_trait]
    impl ContentGenerator for EchoGenerator {
        async fn generate(&self, _prompt: &str) -> std::result::Result<String, GenerationError> {
            Ok("<html><head></head><body><h1>Hi</h1></body></html>".to_string())
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            Arc::new(StaticFetcher),
            Arc::new(EchoGenerator),
            Config::default(),
        )
    }

    #[test]
    fn test_display_url() {
        assert_eq!(display_url("example.com").unwrap(), "https://example.com/");
        assert_eq!(display_url(" not a url:: ").unwrap(), "not a url::");
        assert!(matches!(display_url("   "), Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_submit_stores_normalized_url() {
        let orchestrator = orchestrator();
        let id = orchestrator
            .submit("example.com", CloneOptions::new())
            .await
            .unwrap();

        let job = orchestrator.get_status(id).await.unwrap();
        assert_eq!(job.url, "https://example.com/");
        assert_eq!(orchestrator.job_count().await, 1);
    }

    #[tokio::test]
    async fn test_document_after_completion() {
        let orchestrator = orchestrator();
        let (id, mut sub) = orchestrator
            .submit_and_subscribe("https://example.com", CloneOptions::new())
            .await
            .unwrap();
        while sub.recv().await.is_some() {}

        let document = orchestrator.get_document(id).await.unwrap();
        assert!(document.as_str().contains("<h1>Hi</h1>"));
        assert!(document.as_str().contains(r#"name="viewport""#));

        let job = orchestrator.get_status(id).await.unwrap();
        match job.result {
            Some(JobResult::Completed(output)) => {
                assert_eq!(output.metadata.generator, "echo");
                assert_eq!(output.metadata.original_url, "https://example.com/");
                assert_eq!(output.metadata.fingerprint_summary.heading_counts.get("h1"), Some(&1));
            },
            other => panic!("expected completed result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_job_lookups() {
        let orchestrator = orchestrator();
        let id = JobId::new();
        assert!(orchestrator.get_status(id).await.is_none());
        assert!(matches!(
            orchestrator.get_document(id).await,
            Err(Error::NotFound(_))
        ));
        assert!(orchestrator.subscribe(id).await.is_err());
    }
}
