//! In-memory job table.
//!
//! The orchestrator is the only writer. Every mutation runs under the write
//! lock together with the status publish, so subscribers observe transitions
//! in the order they were applied.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::bus::{NotificationBus, Subscription};
use crate::types::{CloneJob, JobId, JobResult, JobStatus, StatusEvent};

/// Owned table of clone jobs plus their notification bus.
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, CloneJob>>,
    bus: NotificationBus,
}

impl JobStore {
    /// Creates an empty table publishing on `bus`.
    #[must_use]
    pub fn new(bus: NotificationBus) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            bus,
        }
    }

    /// Bus carrying this table's status events.
    pub const fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Insert a fresh `pending` job and publish its creation.
    pub async fn insert(&self, job: CloneJob) -> JobId {
        let id = job.id;
        let mut jobs = self.jobs.write().await;
        self.bus
            .publish(&StatusEvent::transition(&job, Some("Clone request submitted")));
        jobs.insert(id, job);
        id
    }

    /// Insert a job and attach a subscriber before anything else can touch it.
    pub async fn insert_subscribed(&self, job: CloneJob) -> (JobId, Subscription) {
        let id = job.id;
        let mut jobs = self.jobs.write().await;
        let subscription = self.bus.subscribe(id, job.snapshot_event());
        jobs.insert(id, job);
        (id, subscription)
    }

    /// Move a job to a non-terminal `status`.
    ///
    /// Backward or repeated transitions are ignored.
    pub async fn advance(&self, id: JobId, status: JobStatus, message: &str) -> bool {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&id) else {
            return false;
        };
        if !job.status.can_advance_to(status) {
            warn!(job_id = %id, from = %job.status, to = %status, "Ignoring out-of-order transition");
            return false;
        }
        job.status = status;
        info!(job_id = %id, status = %status, "Clone job advanced");
        self.bus.publish(&StatusEvent::transition(job, Some(message)));
        true
    }

    /// Set the terminal result and status in one write.
    pub async fn finish(&self, id: JobId, result: JobResult) -> bool {
        let status = match &result {
            JobResult::Completed(_) => JobStatus::Completed,
            JobResult::Failed { .. } => JobStatus::Failed,
        };
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&id) else {
            return false;
        };
        if !job.status.can_advance_to(status) {
            warn!(job_id = %id, from = %job.status, to = %status, "Job already finished");
            return false;
        }
        job.status = status;
        job.result = Some(result);
        job.completed_at = Some(Utc::now());

        let message = match status {
            JobStatus::Completed => "Clone completed",
            _ => "Clone failed",
        };
        info!(job_id = %id, status = %status, "Clone job finished");
        self.bus.publish(&StatusEvent::transition(job, Some(message)));
        true
    }

    /// Copy of the job record.
    pub async fn get(&self, id: JobId) -> Option<CloneJob> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// Subscribe with the current snapshot, or `None` for unknown jobs.
    pub async fn subscribe(&self, id: JobId) -> Option<Subscription> {
        let jobs = self.jobs.read().await;
        let job = jobs.get(&id)?;
        Some(self.bus.subscribe(id, job.snapshot_event()))
    }

    /// Number of tracked jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Whether no job has been submitted.
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store() -> JobStore {
        JobStore::new(NotificationBus::new())
    }

    fn job() -> CloneJob {
        CloneJob::new("https://example.com/".into(), serde_json::Map::new())
    }

    #[tokio::test]
    async fn test_forward_transitions_only() {
        let store = store();
        let id = store.insert(job()).await;

        assert!(store.advance(id, JobStatus::Scraping, "scraping").await);
        assert!(store.advance(id, JobStatus::Cloning, "cloning").await);
        assert!(!store.advance(id, JobStatus::Scraping, "again").await);
        assert_eq!(store.get(id).await.unwrap().status, JobStatus::Cloning);
    }

    #[tokio::test]
    async fn test_result_set_once_with_terminal_status() {
        let store = store();
        let id = store.insert(job()).await;

        assert!(
            store
                .finish(id, JobResult::Failed { error: "first".into() })
                .await
        );
        assert!(
            !store
                .finish(id, JobResult::Failed { error: "second".into() })
                .await
        );

        let record = store.get(id).await.unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.result.unwrap().error(), Some("first"));
        assert!(record.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let store = store();
        let id = JobId::new();
        assert!(!store.advance(id, JobStatus::Scraping, "x").await);
        assert!(store.get(id).await.is_none());
        assert!(store.subscribe(id).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_subscriber_sees_transitions_in_order() {
        let store = store();
        let (id, mut sub) = store.insert_subscribed(job()).await;

        store.advance(id, JobStatus::Scraping, "s").await;
        store
            .finish(id, JobResult::Failed { error: "boom".into() })
            .await;

        let mut seen = Vec::new();
        while let Some(event) = sub.recv().await {
            seen.push(event.status);
        }
        assert_eq!(
            seen,
            vec![JobStatus::Pending, JobStatus::Scraping, JobStatus::Failed]
        );
        assert_eq!(store.len().await, 1);
    }
}
