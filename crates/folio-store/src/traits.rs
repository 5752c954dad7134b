//! Async repository traits consumed by the analysis engine.
//!
//! `update_analysis` persists text + embedding, sets the entity `Success`
//! and clears any previous error in a single write, so there is no window
//! where an entity is `Success` without its analysis fields.

use chrono::{DateTime, Utc};

use folio_models::{
    AnalysisJob, AnalysisStatus, CreatorContext, ImageAsset, JobId, JobStatus, MediaId, Portfolio,
    Project, VideoAsset,
};

use crate::error::StoreResult;

/// Persistence for analysis jobs.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait::async_trait]
pub trait JobStore: Send + Sync {
    /// Create a new job record.
    async fn create(&self, job: &AnalysisJob) -> StoreResult<()>;

    /// Fetch a job by ID.
    async fn get(&self, id: &JobId) -> StoreResult<Option<AnalysisJob>>;

    /// Update job status and error message. Terminal statuses also set
    /// `completed_at`.
    async fn update_status(
        &self,
        id: &JobId,
        status: JobStatus,
        error: Option<String>,
    ) -> StoreResult<()>;

    /// Update job progress. Must never decrease a job's persisted progress.
    async fn update_progress(&self, id: &JobId, percent: f32) -> StoreResult<()>;

    /// Most recently created job for a portfolio, if any.
    async fn last_job_for_portfolio(&self, portfolio_id: &str) -> StoreResult<Option<AnalysisJob>>;

    /// Count jobs created for a portfolio since the given instant.
    async fn count_jobs_since(
        &self,
        portfolio_id: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<u32>;

    /// All jobs currently in `Processing`, for the stale-job sweep.
    async fn list_processing(&self) -> StoreResult<Vec<AnalysisJob>>;
}

/// Persistence for image assets.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    async fn get(&self, id: &MediaId) -> StoreResult<Option<ImageAsset>>;

    async fn list_for_project(&self, project_id: &str) -> StoreResult<Vec<ImageAsset>>;

    /// Images with `Success` status, regardless of which job run produced
    /// them.
    async fn list_successful_for_project(&self, project_id: &str) -> StoreResult<Vec<ImageAsset>>;

    async fn update_status(
        &self,
        id: &MediaId,
        status: AnalysisStatus,
        error: Option<String>,
    ) -> StoreResult<()>;

    async fn update_analysis(
        &self,
        id: &MediaId,
        text: String,
        embedding: Vec<f32>,
    ) -> StoreResult<()>;
}

/// Persistence for video assets.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait::async_trait]
pub trait VideoStore: Send + Sync {
    async fn get(&self, id: &MediaId) -> StoreResult<Option<VideoAsset>>;

    async fn list_for_project(&self, project_id: &str) -> StoreResult<Vec<VideoAsset>>;

    async fn list_successful_for_project(&self, project_id: &str) -> StoreResult<Vec<VideoAsset>>;

    async fn update_status(
        &self,
        id: &MediaId,
        status: AnalysisStatus,
        error: Option<String>,
    ) -> StoreResult<()>;

    async fn update_analysis(
        &self,
        id: &MediaId,
        text: String,
        embedding: Vec<f32>,
    ) -> StoreResult<()>;
}

/// Persistence for projects.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait::async_trait]
pub trait ProjectStore: Send + Sync {
    async fn get(&self, id: &str) -> StoreResult<Option<Project>>;

    async fn list_for_portfolio(&self, portfolio_id: &str) -> StoreResult<Vec<Project>>;

    async fn list_successful_for_portfolio(&self, portfolio_id: &str)
        -> StoreResult<Vec<Project>>;

    async fn update_status(
        &self,
        id: &str,
        status: AnalysisStatus,
        error: Option<String>,
    ) -> StoreResult<()>;

    async fn update_analysis(&self, id: &str, text: String, embedding: Vec<f32>)
        -> StoreResult<()>;
}

/// Persistence for portfolios plus creator context lookups.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait::async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn get(&self, id: &str) -> StoreResult<Option<Portfolio>>;

    async fn update_status(
        &self,
        id: &str,
        status: AnalysisStatus,
        error: Option<String>,
    ) -> StoreResult<()>;

    async fn update_analysis(&self, id: &str, text: String, embedding: Vec<f32>)
        -> StoreResult<()>;

    /// Creator profile fields blended into portfolio synthesis.
    async fn creator_context(&self, creator_id: &str) -> StoreResult<CreatorContext>;
}
