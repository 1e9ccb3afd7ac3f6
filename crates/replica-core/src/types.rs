//! Job records, status events and the repaired document type.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fingerprint::FingerprintSummary;

/// Opaque clone job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Pipeline stage of a clone job.
///
/// Transitions only move forward: `pending → scraping → cloning → completed | failed`.
/// Any non-terminal state may jump straight to `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, pipeline not started.
    Pending,
    /// Fetching and analyzing the page.
    Scraping,
    /// Waiting on the generator.
    Cloning,
    /// Document available.
    Completed,
    /// Terminal error; see the job result.
    Failed,
}

impl JobStatus {
    const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Scraping => 1,
            Self::Cloning => 2,
            Self::Completed | Self::Failed => 3,
        }
    }

    /// `completed` and `failed` end the pipeline.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving from `self` to `next` keeps the sequence strictly forward.
    ///
    /// ```rust
    /// use replica_core::JobStatus;
    ///
    /// assert!(JobStatus::Pending.can_advance_to(JobStatus::Scraping));
    /// assert!(JobStatus::Scraping.can_advance_to(JobStatus::Failed));
    /// assert!(!JobStatus::Cloning.can_advance_to(JobStatus::Scraping));
    /// assert!(!JobStatus::Completed.can_advance_to(JobStatus::Failed));
    /// ```
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scraping => "scraping",
            Self::Cloning => "cloning",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A repaired, render-ready markup document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratedDocument(String);

impl GeneratedDocument {
    pub(crate) const fn new(markup: String) -> Self {
        Self(markup)
    }

    /// Borrow the markup.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take ownership of the markup.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for GeneratedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata attached to a successful clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneMetadata {
    /// Normalized URL that was fetched.
    pub original_url: String,
    /// Name of the generator that produced the document.
    pub generator: String,
    /// Headline numbers from the page fingerprint.
    pub fingerprint_summary: FingerprintSummary,
}

/// Successful pipeline output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneOutput {
    /// Repaired, render-ready document.
    pub document: GeneratedDocument,
    /// Provenance of the document.
    pub metadata: CloneMetadata,
}

/// Final outcome of a job, set exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobResult {
    /// The pipeline produced a document.
    Completed(CloneOutput),
    /// The pipeline stopped with an error.
    Failed {
        /// User-facing error text.
        error: String,
    },
}

impl JobResult {
    /// Error text for failed jobs.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { error } => Some(error),
            Self::Completed(_) => None,
        }
    }
}

/// One tracked clone attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneJob {
    /// Unique job identifier.
    pub id: JobId,
    /// Normalized URL, or the trimmed input when it does not parse.
    pub url: String,
    /// Creation time.
    pub submitted_at: DateTime<Utc>,
    /// Current stage.
    pub status: JobStatus,
    /// Set once, together with the terminal status.
    pub result: Option<JobResult>,
    /// Time the job reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Caller-supplied options, passed through untouched.
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl CloneJob {
    /// Create a `pending` job record.
    #[must_use]
    pub fn new(url: String, options: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            id: JobId::new(),
            url,
            submitted_at: Utc::now(),
            status: JobStatus::Pending,
            result: None,
            completed_at: None,
            options,
        }
    }

    /// The repaired document, if the job completed.
    #[must_use]
    pub fn document(&self) -> Option<&GeneratedDocument> {
        match &self.result {
            Some(JobResult::Completed(output)) => Some(&output.document),
            _ => None,
        }
    }

    /// Status event describing the current snapshot.
    #[must_use]
    pub fn snapshot_event(&self) -> StatusEvent {
        StatusEvent {
            job_id: self.id,
            status: self.status,
            url: self.url.clone(),
            message: None,
            error: self.result.as_ref().and_then(JobResult::error).map(str::to_string),
            timestamp: Utc::now(),
        }
    }
}

/// Notification published on every status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Job the event belongs to.
    pub job_id: JobId,
    /// Status after the transition.
    pub status: JobStatus,
    /// URL of the job.
    pub url: String,
    /// Human-readable progress note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error text, only on `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the transition happened.
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    /// Event for a transition into `status`.
    #[must_use]
    pub fn transition(job: &CloneJob, message: Option<&str>) -> Self {
        let mut event = job.snapshot_event();
        event.message = message.map(str::to_string);
        event
    }
}
