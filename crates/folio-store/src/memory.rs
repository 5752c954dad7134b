//! In-memory store implementation.
//!
//! Backs the engine test suites and embedded/demo deployments. All five
//! repository traits are implemented over a single `RwLock`-guarded map
//! set, so cross-aggregate reads in tests see a consistent snapshot.
//!
//! The store counts entity writes and records the full sequence of progress
//! values per job; the engine's idempotence and monotonic-progress tests
//! assert against both.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use folio_models::{
    AnalysisJob, AnalysisStatus, CreatorContext, ImageAsset, JobId, JobStatus, MediaId, Portfolio,
    Project, VideoAsset,
};

use crate::error::{StoreError, StoreResult};
use crate::traits::{ImageStore, JobStore, PortfolioStore, ProjectStore, VideoStore};

#[derive(Default)]
struct Inner {
    jobs: HashMap<String, AnalysisJob>,
    progress_history: HashMap<String, Vec<f32>>,
    images: HashMap<String, ImageAsset>,
    videos: HashMap<String, VideoAsset>,
    projects: HashMap<String, Project>,
    portfolios: HashMap<String, Portfolio>,
    creators: HashMap<String, CreatorContext>,
}

/// In-memory implementation of all repository traits.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total entity/job mutations performed through the trait methods.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// The sequence of progress values persisted for a job, in write order.
    pub async fn progress_history(&self, job_id: &JobId) -> Vec<f32> {
        self.inner
            .read()
            .await
            .progress_history
            .get(job_id.as_str())
            .cloned()
            .unwrap_or_default()
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    // Seeding helpers for tests and bootstrap.

    pub async fn insert_image(&self, image: ImageAsset) {
        self.inner
            .write()
            .await
            .images
            .insert(image.id.as_str().to_string(), image);
    }

    pub async fn insert_video(&self, video: VideoAsset) {
        self.inner
            .write()
            .await
            .videos
            .insert(video.id.as_str().to_string(), video);
    }

    pub async fn insert_project(&self, project: Project) {
        self.inner
            .write()
            .await
            .projects
            .insert(project.id.clone(), project);
    }

    pub async fn insert_portfolio(&self, portfolio: Portfolio) {
        self.inner
            .write()
            .await
            .portfolios
            .insert(portfolio.id.clone(), portfolio);
    }

    pub async fn insert_creator(&self, creator_id: impl Into<String>, context: CreatorContext) {
        self.inner
            .write()
            .await
            .creators
            .insert(creator_id.into(), context);
    }

    pub async fn image(&self, id: &MediaId) -> Option<ImageAsset> {
        self.inner.read().await.images.get(id.as_str()).cloned()
    }

    pub async fn video(&self, id: &MediaId) -> Option<VideoAsset> {
        self.inner.read().await.videos.get(id.as_str()).cloned()
    }

    pub async fn project(&self, id: &str) -> Option<Project> {
        self.inner.read().await.projects.get(id).cloned()
    }

    pub async fn portfolio(&self, id: &str) -> Option<Portfolio> {
        self.inner.read().await.portfolios.get(id).cloned()
    }
}

#[async_trait::async_trait]
impl JobStore for MemoryStore {
    async fn create(&self, job: &AnalysisJob) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.jobs.contains_key(job.id.as_str()) {
            return Err(StoreError::conflict(format!("job {} exists", job.id)));
        }
        inner.jobs.insert(job.id.as_str().to_string(), job.clone());
        self.record_write();
        Ok(())
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<AnalysisJob>> {
        Ok(self.inner.read().await.jobs.get(id.as_str()).cloned())
    }

    async fn update_status(
        &self,
        id: &JobId,
        status: JobStatus,
        error: Option<String>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found(format!("job {}", id)))?;
        job.status = status;
        if error.is_some() {
            job.error = error;
        }
        let now = Utc::now();
        job.updated_at = now;
        if status.is_terminal() {
            job.completed_at = Some(now);
            if status == JobStatus::Completed {
                job.progress = 100.0;
            }
        }
        self.record_write();
        Ok(())
    }

    async fn update_progress(&self, id: &JobId, percent: f32) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found(format!("job {}", id)))?;
        job.set_progress(percent);
        let persisted = job.progress;
        inner
            .progress_history
            .entry(id.as_str().to_string())
            .or_default()
            .push(persisted);
        self.record_write();
        Ok(())
    }

    async fn last_job_for_portfolio(&self, portfolio_id: &str) -> StoreResult<Option<AnalysisJob>> {
        Ok(self
            .inner
            .read()
            .await
            .jobs
            .values()
            .filter(|j| j.portfolio_id == portfolio_id)
            .max_by_key(|j| j.created_at)
            .cloned())
    }

    async fn count_jobs_since(
        &self,
        portfolio_id: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<u32> {
        Ok(self
            .inner
            .read()
            .await
            .jobs
            .values()
            .filter(|j| j.portfolio_id == portfolio_id && j.created_at >= since)
            .count() as u32)
    }

    async fn list_processing(&self) -> StoreResult<Vec<AnalysisJob>> {
        Ok(self
            .inner
            .read()
            .await
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Processing)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl ImageStore for MemoryStore {
    async fn get(&self, id: &MediaId) -> StoreResult<Option<ImageAsset>> {
        Ok(self.inner.read().await.images.get(id.as_str()).cloned())
    }

    async fn list_for_project(&self, project_id: &str) -> StoreResult<Vec<ImageAsset>> {
        Ok(self
            .inner
            .read()
            .await
            .images
            .values()
            .filter(|i| i.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn list_successful_for_project(&self, project_id: &str) -> StoreResult<Vec<ImageAsset>> {
        Ok(self
            .inner
            .read()
            .await
            .images
            .values()
            .filter(|i| i.project_id == project_id && i.analysis_status == AnalysisStatus::Success)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: &MediaId,
        status: AnalysisStatus,
        error: Option<String>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let image = inner
            .images
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found(format!("image {}", id)))?;
        image.analysis_status = status;
        image.analysis_error = error;
        image.updated_at = Utc::now();
        self.record_write();
        Ok(())
    }

    async fn update_analysis(
        &self,
        id: &MediaId,
        text: String,
        embedding: Vec<f32>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let image = inner
            .images
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found(format!("image {}", id)))?;
        image.ai_analysis = Some(text);
        image.embedding = Some(embedding);
        image.analysis_status = AnalysisStatus::Success;
        image.analysis_error = None;
        image.updated_at = Utc::now();
        self.record_write();
        Ok(())
    }
}

#[async_trait::async_trait]
impl VideoStore for MemoryStore {
    async fn get(&self, id: &MediaId) -> StoreResult<Option<VideoAsset>> {
        Ok(self.inner.read().await.videos.get(id.as_str()).cloned())
    }

    async fn list_for_project(&self, project_id: &str) -> StoreResult<Vec<VideoAsset>> {
        Ok(self
            .inner
            .read()
            .await
            .videos
            .values()
            .filter(|v| v.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn list_successful_for_project(&self, project_id: &str) -> StoreResult<Vec<VideoAsset>> {
        Ok(self
            .inner
            .read()
            .await
            .videos
            .values()
            .filter(|v| v.project_id == project_id && v.analysis_status == AnalysisStatus::Success)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: &MediaId,
        status: AnalysisStatus,
        error: Option<String>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let video = inner
            .videos
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found(format!("video {}", id)))?;
        video.analysis_status = status;
        video.analysis_error = error;
        video.updated_at = Utc::now();
        self.record_write();
        Ok(())
    }

    async fn update_analysis(
        &self,
        id: &MediaId,
        text: String,
        embedding: Vec<f32>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let video = inner
            .videos
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found(format!("video {}", id)))?;
        video.ai_analysis = Some(text);
        video.embedding = Some(embedding);
        video.analysis_status = AnalysisStatus::Success;
        video.analysis_error = None;
        video.updated_at = Utc::now();
        self.record_write();
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProjectStore for MemoryStore {
    async fn get(&self, id: &str) -> StoreResult<Option<Project>> {
        Ok(self.inner.read().await.projects.get(id).cloned())
    }

    async fn list_for_portfolio(&self, portfolio_id: &str) -> StoreResult<Vec<Project>> {
        let mut projects: Vec<Project> = self
            .inner
            .read()
            .await
            .projects
            .values()
            .filter(|p| p.portfolio_id == portfolio_id)
            .cloned()
            .collect();
        // Stable ordering keeps progress math deterministic across runs.
        projects.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(projects)
    }

    async fn list_successful_for_portfolio(
        &self,
        portfolio_id: &str,
    ) -> StoreResult<Vec<Project>> {
        let mut projects: Vec<Project> = self
            .inner
            .read()
            .await
            .projects
            .values()
            .filter(|p| {
                p.portfolio_id == portfolio_id && p.analysis_status == AnalysisStatus::Success
            })
            .cloned()
            .collect();
        projects.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(projects)
    }

    async fn update_status(
        &self,
        id: &str,
        status: AnalysisStatus,
        error: Option<String>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let project = inner
            .projects
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(format!("project {}", id)))?;
        project.analysis_status = status;
        project.analysis_error = error;
        project.updated_at = Utc::now();
        self.record_write();
        Ok(())
    }

    async fn update_analysis(
        &self,
        id: &str,
        text: String,
        embedding: Vec<f32>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let project = inner
            .projects
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(format!("project {}", id)))?;
        project.ai_analysis = Some(text);
        project.embedding = Some(embedding);
        project.analysis_status = AnalysisStatus::Success;
        project.analysis_error = None;
        project.updated_at = Utc::now();
        self.record_write();
        Ok(())
    }
}

#[async_trait::async_trait]
impl PortfolioStore for MemoryStore {
    async fn get(&self, id: &str) -> StoreResult<Option<Portfolio>> {
        Ok(self.inner.read().await.portfolios.get(id).cloned())
    }

    async fn update_status(
        &self,
        id: &str,
        status: AnalysisStatus,
        error: Option<String>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let portfolio = inner
            .portfolios
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(format!("portfolio {}", id)))?;
        portfolio.analysis_status = status;
        portfolio.analysis_error = error;
        portfolio.updated_at = Utc::now();
        self.record_write();
        Ok(())
    }

    async fn update_analysis(
        &self,
        id: &str,
        text: String,
        embedding: Vec<f32>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let portfolio = inner
            .portfolios
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(format!("portfolio {}", id)))?;
        portfolio.ai_analysis = Some(text);
        portfolio.embedding = Some(embedding);
        portfolio.analysis_status = AnalysisStatus::Success;
        portfolio.analysis_error = None;
        portfolio.updated_at = Utc::now();
        self.record_write();
        Ok(())
    }

    async fn creator_context(&self, creator_id: &str) -> StoreResult<CreatorContext> {
        self.inner
            .read()
            .await
            .creators
            .get(creator_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("creator {}", creator_id)))
    }
}
