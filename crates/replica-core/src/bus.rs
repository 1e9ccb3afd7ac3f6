//! Per-job status fan-out.
//!
//! Each job has a topic holding its live subscribers. Publishing pushes the
//! event into every subscriber's unbounded channel, so delivery never blocks
//! the publisher. A subscriber whose receiver is gone is dropped on the next
//! publish; a topic with no subscribers left is removed.
//!
//! A terminal event closes the topic: every stream ends after yielding it.
//! Subscribing to a job that already finished yields the snapshot and an
//! already-finished stream.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::debug;

use crate::types::{JobId, StatusEvent};

struct Subscriber {
    id: u64,
    tx: UnboundedSender<StatusEvent>,
}

#[derive(Default)]
struct Topics {
    by_job: HashMap<JobId, Vec<Subscriber>>,
}

/// Subscriber registry shared between the orchestrator and its subscriptions.
#[derive(Clone, Default)]
pub struct NotificationBus {
    topics: Arc<Mutex<Topics>>,
    next_id: Arc<AtomicU64>,
}

impl NotificationBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Topics> {
        // A poisoned registry only means a subscriber panicked mid-push.
        self.topics
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Register a subscriber for `job_id`, delivering `snapshot` first.
    pub fn subscribe(&self, job_id: JobId, snapshot: StatusEvent) -> Subscription {
        let (tx, rx) = unbounded_channel();
        let terminal = snapshot.status.is_terminal();
        let _ = tx.send(snapshot);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if !terminal {
            self.lock()
                .by_job
                .entry(job_id)
                .or_default()
                .push(Subscriber { id, tx });
        }
        debug!(%job_id, subscriber = id, terminal, "Subscribed");

        Subscription {
            job_id,
            id,
            rx,
            bus: self.clone(),
        }
    }

    /// Deliver `event` to every current subscriber of its job.
    pub fn publish(&self, event: &StatusEvent) {
        let mut topics = self.lock();
        let job_id = event.job_id;

        if event.status.is_terminal() {
            if let Some(subscribers) = topics.by_job.remove(&job_id) {
                for subscriber in subscribers {
                    let _ = subscriber.tx.send(event.clone());
                }
            }
            return;
        }

        let Some(subscribers) = topics.by_job.get_mut(&job_id) else {
            return;
        };
        subscribers.retain(|subscriber| subscriber.tx.send(event.clone()).is_ok());
        if subscribers.is_empty() {
            topics.by_job.remove(&job_id);
        }
    }

    fn unsubscribe(&self, job_id: JobId, id: u64) {
        let mut topics = self.lock();
        if let Some(subscribers) = topics.by_job.get_mut(&job_id) {
            subscribers.retain(|subscriber| subscriber.id != id);
            if subscribers.is_empty() {
                topics.by_job.remove(&job_id);
            }
        }
    }

    /// Live subscribers of `job_id`.
    #[must_use]
    pub fn subscriber_count(&self, job_id: JobId) -> usize {
        self.lock().by_job.get(&job_id).map_or(0, Vec::len)
    }

    /// Jobs with at least one live subscriber.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.lock().by_job.len()
    }
}

/// Stream of status events for one job.
///
/// Dropping the subscription unregisters it.
pub struct Subscription {
    job_id: JobId,
    id: u64,
    rx: UnboundedReceiver<StatusEvent>,
    bus: NotificationBus,
}

impl Subscription {
    /// Job this subscription follows.
    #[must_use]
    pub const fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Next event, or `None` once the job has finished.
    pub async fn recv(&mut self) -> Option<StatusEvent> {
        self.rx.recv().await
    }
}

impl Stream for Subscription {
    type Item = StatusEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.job_id, self.id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{CloneJob, JobStatus};
    use futures::StreamExt;

    fn job() -> CloneJob {
        CloneJob::new("https://example.com/".into(), serde_json::Map::new())
    }

    fn event(job: &CloneJob, status: JobStatus) -> StatusEvent {
        let mut event = job.snapshot_event();
        event.status = status;
        event
    }

    #[tokio::test]
    async fn test_snapshot_delivered_first() {
        let bus = NotificationBus::new();
        let job = job();

        let mut sub = bus.subscribe(job.id, job.snapshot_event());
        bus.publish(&event(&job, JobStatus::Scraping));

        assert_eq!(sub.recv().await.unwrap().status, JobStatus::Pending);
        assert_eq!(sub.recv().await.unwrap().status, JobStatus::Scraping);
    }

    #[tokio::test]
    async fn test_terminal_event_ends_streams_and_drops_topic() {
        let bus = NotificationBus::new();
        let job = job();
        let first = bus.subscribe(job.id, job.snapshot_event());
        let second = bus.subscribe(job.id, job.snapshot_event());
        assert_eq!(bus.subscriber_count(job.id), 2);

        bus.publish(&event(&job, JobStatus::Cloning));
        bus.publish(&event(&job, JobStatus::Completed));
        assert_eq!(bus.topic_count(), 0);

        for sub in [first, second] {
            let statuses: Vec<JobStatus> = sub.map(|e| e.status).collect().await;
            assert_eq!(
                statuses,
                vec![JobStatus::Pending, JobStatus::Cloning, JobStatus::Completed]
            );
        }
    }

    #[tokio::test]
    async fn test_subscribe_after_finish_yields_snapshot_only() {
        let bus = NotificationBus::new();
        let job = job();

        let sub = bus.subscribe(job.id, event(&job, JobStatus::Failed));

        assert_eq!(bus.topic_count(), 0);
        let statuses: Vec<JobStatus> = sub.map(|e| e.status).collect().await;
        assert_eq!(statuses, vec![JobStatus::Failed]);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = NotificationBus::new();
        let job = job();

        let kept = bus.subscribe(job.id, job.snapshot_event());
        let dropped = bus.subscribe(job.id, job.snapshot_event());
        drop(dropped);
        assert_eq!(bus.subscriber_count(job.id), 1);

        drop(kept);
        assert_eq!(bus.topic_count(), 0);
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = NotificationBus::new();
        let job = job();
        bus.publish(&event(&job, JobStatus::Scraping));
        assert_eq!(bus.topic_count(), 0);
    }

    #[test]
    fn test_topics_are_isolated() {
        let bus = NotificationBus::new();
        let a = job();
        let b = job();
        let _sub_a = bus.subscribe(a.id, a.snapshot_event());
        let _sub_b = bus.subscribe(b.id, b.snapshot_event());

        bus.publish(&event(&a, JobStatus::Completed));

        assert_eq!(bus.subscriber_count(a.id), 0);
        assert_eq!(bus.subscriber_count(b.id), 1);
    }
}
