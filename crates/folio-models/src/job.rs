//! Analysis job definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
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

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created by the API layer, not yet picked up
    #[default]
    Pending,
    /// Orchestrator is driving the job
    Processing,
    /// Job finished; the portfolio synthesis landed (or there was nothing to do)
    Completed,
    /// Job finished with an error
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One portfolio-level analysis run.
///
/// A job owns only its own lifecycle fields. Portfolio, project and media
/// rows are independent aggregates mutated as a side effect of running the
/// job; they stay correct even if the job is abandoned mid-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisJob {
    /// Unique job ID
    pub id: JobId,

    /// Portfolio this run covers
    pub portfolio_id: String,

    /// Creator who owns the portfolio
    pub creator_id: String,

    /// Lifecycle state
    #[serde(default)]
    pub status: JobStatus,

    /// Progress percentage, 0.0 to 100.0, monotonically non-decreasing
    #[serde(default)]
    pub progress: f32,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp; bumped by every status and progress write,
    /// which doubles as the liveness lease for stale-job detection
    pub updated_at: DateTime<Utc>,

    /// Set exactly when the job reaches a terminal state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnalysisJob {
    /// Create a new pending job.
    pub fn new(portfolio_id: impl Into<String>, creator_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            portfolio_id: portfolio_id.into(),
            creator_id: creator_id.into(),
            status: JobStatus::Pending,
            progress: 0.0,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Start processing the job.
    pub fn start(&mut self) {
        self.status = JobStatus::Processing;
        self.updated_at = Utc::now();
    }

    /// Update progress. Clamped to [0, 100] and never allowed to decrease.
    pub fn set_progress(&mut self, progress: f32) {
        let clamped = progress.clamp(0.0, 100.0);
        if clamped > self.progress {
            self.progress = clamped;
        }
        self.updated_at = Utc::now();
    }

    /// Mark job as completed. Progress is forced to exactly 100.
    pub fn complete(&mut self) {
        self.status = JobStatus::Completed;
        self.progress = 100.0;
        let now = Utc::now();
        self.updated_at = now;
        self.completed_at = Some(now);
    }

    /// Mark job as failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        let now = Utc::now();
        self.updated_at = now;
        self.completed_at = Some(now);
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Check if a `Processing` job has gone silent for longer than
    /// `threshold_secs` since its last status or progress write.
    pub fn is_stale(&self, threshold_secs: i64) -> bool {
        self.status == JobStatus::Processing
            && (Utc::now() - self.updated_at).num_seconds() > threshold_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_creation() {
        let job = AnalysisJob::new("portfolio-1", "creator-1");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0.0);
        assert!(job.completed_at.is_none());
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_job_lifecycle() {
        let mut job = AnalysisJob::new("portfolio-1", "creator-1");

        job.start();
        assert_eq!(job.status, JobStatus::Processing);

        job.set_progress(40.0);
        assert_eq!(job.progress, 40.0);

        job.complete();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100.0);
        assert!(job.completed_at.is_some());
        assert!(job.is_terminal());
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut job = AnalysisJob::new("portfolio-1", "creator-1");
        job.set_progress(60.0);
        job.set_progress(30.0);
        assert_eq!(job.progress, 60.0);

        job.set_progress(150.0);
        assert_eq!(job.progress, 100.0);
    }

    #[test]
    fn test_job_failure_sets_completed_at() {
        let mut job = AnalysisJob::new("portfolio-1", "creator-1");
        job.start();
        job.fail("portfolio synthesis produced no text");
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.completed_at.is_some());
        assert_eq!(
            job.error.as_deref(),
            Some("portfolio synthesis produced no text")
        );
    }

    #[test]
    fn test_stale_detection() {
        let mut job = AnalysisJob::new("portfolio-1", "creator-1");
        job.start();
        assert!(!job.is_stale(60));

        job.updated_at = Utc::now() - chrono::Duration::seconds(120);
        assert!(job.is_stale(60));

        // Terminal jobs are never stale
        job.complete();
        job.updated_at = Utc::now() - chrono::Duration::seconds(120);
        assert!(!job.is_stale(60));
    }
}
