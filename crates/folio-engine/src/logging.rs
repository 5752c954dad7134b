//! Structured job logging utilities.
//!
//! Consistent structured logging for analysis jobs with contextual fields.

use tracing::{error, info};

use folio_models::JobId;

/// Job logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    stage: String,
}

impl JobLogger {
    /// Create a logger for a job and stage (e.g. "portfolio_analysis").
    pub fn new(job_id: &JobId, stage: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            stage: stage.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            stage = %self.stage,
            "Job started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            stage = %self.stage,
            "Job progress: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            stage = %self.stage,
            "Job error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            stage = %self.stage,
            "Job completed: {}", message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_is_inert_without_subscriber() {
        let logger = JobLogger::new(&JobId::new(), "portfolio_analysis");
        logger.log_start("starting");
        logger.log_progress("halfway");
        logger.log_error("broken");
        logger.log_completion("done");
    }
}
