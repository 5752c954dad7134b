//! Portfolio job orchestration.
//!
//! A job runs three barrier-separated stages over a portfolio tree:
//! media analysis per project (Stage A), project synthesis (Stage B), then
//! a single portfolio synthesis (Stage C). Media and project failures are
//! recorded on the entities and do not abort their stage; Stage C failure
//! fails the job since the portfolio analysis is its deliverable.
//!
//! Progress is reported as completed steps out of `2n + 1` for `n`
//! projects: one step per project in each of Stages A and B, one for
//! Stage C. Jobs always reach a terminal state; any unhandled error is
//! caught and persisted as `Failed`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{info, warn};

use folio_models::{JobId, JobStatus, Project};
use folio_store::JobStore;

use crate::analyzer::{
    analyze_image, analyze_portfolio, analyze_project, analyze_video, AnalyzerContext, Outcome,
};
use crate::error::{EngineError, EngineResult};
use crate::logging::JobLogger;

/// Message persisted when a portfolio has no projects.
pub const NO_PROJECTS_MESSAGE: &str = "No projects found to analyze";

/// Drives portfolio analysis jobs to a terminal state.
pub struct JobOrchestrator {
    ctx: AnalyzerContext,
}

impl JobOrchestrator {
    pub fn new(ctx: AnalyzerContext) -> Self {
        Self { ctx }
    }

    /// Run one portfolio analysis job to completion.
    ///
    /// On error the job is persisted `Failed` with the error message before
    /// the error is returned; a job is never left `Processing`.
    pub async fn run_portfolio_job(&self, job_id: &JobId) -> EngineResult<()> {
        let job = self
            .ctx
            .jobs
            .get(job_id)
            .await?
            .ok_or_else(|| EngineError::JobNotFound(job_id.to_string()))?;
        let logger = JobLogger::new(job_id, "portfolio_analysis");
        logger.log_start(&format!("portfolio {}", job.portfolio_id));

        self.ctx
            .jobs
            .update_status(job_id, JobStatus::Processing, None)
            .await?;

        match self.run_stages(job_id, &job.portfolio_id, &logger).await {
            Ok(message) => {
                self.ctx.jobs.update_progress(job_id, 100.0).await?;
                self.ctx
                    .jobs
                    .update_status(job_id, JobStatus::Completed, message)
                    .await?;
                logger.log_completion("all stages finished");
                Ok(())
            }
            Err(e) => {
                logger.log_error(&e.to_string());
                if let Err(write_err) = self
                    .ctx
                    .jobs
                    .update_status(job_id, JobStatus::Failed, Some(e.to_string()))
                    .await
                {
                    logger.log_error(&format!("failed to persist job failure: {write_err}"));
                }
                Err(e)
            }
        }
    }

    /// Run stages A through C, returning an informational completion
    /// message when there is one.
    async fn run_stages(
        &self,
        job_id: &JobId,
        portfolio_id: &str,
        logger: &JobLogger,
    ) -> EngineResult<Option<String>> {
        let projects = self.ctx.projects.list_for_portfolio(portfolio_id).await?;
        if projects.is_empty() {
            return Ok(Some(NO_PROJECTS_MESSAGE.to_string()));
        }

        let total_steps = 2 * projects.len() + 1;
        let steps_done = AtomicUsize::new(0);

        // Stage A: media analysis for every project, in parallel. Individual
        // analyzer failures are recorded on the entities only.
        logger.log_progress(&format!(
            "stage A: media analysis across {} projects",
            projects.len()
        ));
        join_all(projects.iter().map(|project| {
            let steps_done = &steps_done;
            async move {
                self.analyze_project_media(project).await;
                self.bump_progress(job_id, steps_done, total_steps).await;
            }
        }))
        .await;

        // Stage B: project synthesis, barrier after Stage A has fully
        // settled.
        logger.log_progress("stage B: project synthesis");
        join_all(projects.iter().map(|project| {
            let steps_done = &steps_done;
            async move {
                if let Err(e) = analyze_project(&self.ctx, project).await {
                    warn!(
                        project_id = %project.id,
                        error = %e,
                        "Project synthesis failed, continuing"
                    );
                }
                self.bump_progress(job_id, steps_done, total_steps).await;
            }
        }))
        .await;

        // Let eventually consistent writes land before the final read.
        if !self.ctx.config.settle_delay.is_zero() {
            tokio::time::sleep(self.ctx.config.settle_delay).await;
        }

        // Stage C: portfolio synthesis over the re-fetched successful
        // projects. This one failure fails the job.
        logger.log_progress("stage C: portfolio synthesis");
        let portfolio = self
            .ctx
            .portfolios
            .get(portfolio_id)
            .await?
            .ok_or_else(|| EngineError::PortfolioNotFound(portfolio_id.to_string()))?;
        match analyze_portfolio(&self.ctx, &portfolio).await? {
            Outcome::Analyzed | Outcome::SkippedDone => Ok(None),
            Outcome::SkippedNothing => Err(EngineError::NothingToAnalyze),
        }
    }

    /// Run all media analyzers for one project concurrently.
    async fn analyze_project_media(&self, project: &Project) {
        let images = match self.ctx.images.list_for_project(&project.id).await {
            Ok(images) => images,
            Err(e) => {
                warn!(project_id = %project.id, error = %e, "Failed to list images");
                Vec::new()
            }
        };
        let videos = match self.ctx.videos.list_for_project(&project.id).await {
            Ok(videos) => videos,
            Err(e) => {
                warn!(project_id = %project.id, error = %e, "Failed to list videos");
                Vec::new()
            }
        };

        let image_tasks = images.iter().map(|image| {
            let ctx = &self.ctx;
            async move {
                if let Err(e) = analyze_image(ctx, image).await {
                    warn!(image_id = %image.id, error = %e, "Image analysis failed, continuing");
                }
            }
        });
        let video_tasks = videos.iter().map(|video| {
            let ctx = &self.ctx;
            async move {
                if let Err(e) = analyze_video(ctx, video).await {
                    warn!(video_id = %video.id, error = %e, "Video analysis failed, continuing");
                }
            }
        });

        futures::future::join(join_all(image_tasks), join_all(video_tasks)).await;
    }

    async fn bump_progress(&self, job_id: &JobId, steps_done: &AtomicUsize, total_steps: usize) {
        let done = steps_done.fetch_add(1, Ordering::SeqCst) + 1;
        let percent = (done as f32 / total_steps as f32) * 100.0;
        if let Err(e) = self.ctx.jobs.update_progress(job_id, percent).await {
            warn!(job_id = %job_id, error = %e, "Failed to persist progress");
        }
    }
}

/// Fail jobs stuck in `Processing` longer than `threshold`.
///
/// Advisory crash recovery for an external supervisor: a job whose hosting
/// process died stays `Processing` forever otherwise. Returns how many jobs
/// were swept.
pub async fn sweep_stale_jobs(
    jobs: &Arc<dyn JobStore>,
    threshold: Duration,
) -> EngineResult<usize> {
    let threshold_secs = threshold.as_secs() as i64;
    let mut swept = 0;
    for job in jobs.list_processing().await? {
        if job.is_stale(threshold_secs) {
            info!(job_id = %job.id, "Sweeping stale job");
            jobs.update_status(
                &job.id,
                JobStatus::Failed,
                Some(format!(
                    "Job exceeded its processing lease of {threshold_secs}s and was marked stale"
                )),
            )
            .await?;
            swept += 1;
        }
    }
    Ok(swept)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use folio_models::AnalysisJob;
    use folio_store::MemoryStore;

    #[tokio::test]
    async fn test_sweep_fails_only_stale_processing_jobs() {
        let store = Arc::new(MemoryStore::new());

        let mut stale = AnalysisJob::new("portfolio-1", "creator-1");
        stale.status = JobStatus::Processing;
        stale.updated_at = Utc::now() - chrono::Duration::hours(2);
        let stale_id = stale.id.clone();
        store.create(&stale).await.unwrap();

        let mut fresh = AnalysisJob::new("portfolio-2", "creator-1");
        fresh.status = JobStatus::Processing;
        let fresh_id = fresh.id.clone();
        store.create(&fresh).await.unwrap();

        let jobs: Arc<dyn JobStore> = store.clone();
        let swept = sweep_stale_jobs(&jobs, Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(swept, 1);

        let stale = store.get(&stale_id).await.unwrap().unwrap();
        assert_eq!(stale.status, JobStatus::Failed);
        assert!(stale.completed_at.is_some());

        let fresh = store.get(&fresh_id).await.unwrap().unwrap();
        assert_eq!(fresh.status, JobStatus::Processing);
    }
}
