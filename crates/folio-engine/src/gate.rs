//! Reanalysis admission checks.
//!
//! Applied at the entrypoint that creates jobs, not inside the
//! orchestrator, so an operator-forced rerun can bypass it deliberately.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};

use folio_store::JobStore;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

const MONTHLY_WINDOW_DAYS: i64 = 30;

/// Rejects portfolio reanalysis that is too frequent or over quota.
pub struct ReanalysisGate {
    jobs: Arc<dyn JobStore>,
    min_interval: std::time::Duration,
    monthly_limit: usize,
}

impl ReanalysisGate {
    pub fn new(jobs: Arc<dyn JobStore>, config: &EngineConfig) -> Self {
        Self {
            jobs,
            min_interval: config.min_reanalysis_interval,
            monthly_limit: config.monthly_job_limit,
        }
    }

    /// Check whether a new analysis job may be created for this portfolio.
    ///
    /// Denies when the most recent job is younger than the minimum interval
    /// (a zero interval disables that check) or when jobs created in the
    /// trailing 30 days have reached the monthly cap.
    pub async fn check(&self, portfolio_id: &str) -> EngineResult<()> {
        if !self.min_interval.is_zero() {
            if let Some(last) = self.jobs.last_job_for_portfolio(portfolio_id).await? {
                let age = Utc::now() - last.created_at;
                let min = ChronoDuration::from_std(self.min_interval)
                    .unwrap_or(ChronoDuration::MAX);
                if age < min {
                    return Err(EngineError::ReanalysisDenied(format!(
                        "Portfolio {portfolio_id} was analyzed {}s ago, minimum interval is {}s",
                        age.num_seconds(),
                        self.min_interval.as_secs()
                    )));
                }
            }
        }

        let since = Utc::now() - ChronoDuration::days(MONTHLY_WINDOW_DAYS);
        let recent = self.jobs.count_jobs_since(portfolio_id, since).await?;
        if recent as usize >= self.monthly_limit {
            return Err(EngineError::ReanalysisDenied(format!(
                "Portfolio {portfolio_id} has {recent} jobs in the last {MONTHLY_WINDOW_DAYS} \
                 days, limit is {}",
                self.monthly_limit
            )));
        }

        Ok(())
    }
}
