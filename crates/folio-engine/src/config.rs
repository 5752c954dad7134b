//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use folio_models::ContentType;

/// Per-content-type throughput limits.
#[derive(Debug, Clone, Copy)]
pub struct TypeLimits {
    /// Maximum requests in any trailing 60 second window
    pub requests_per_minute: usize,
    /// Maximum in-flight analyses
    pub max_concurrent: usize,
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Rate/concurrency limits per content type
    pub image_limits: TypeLimits,
    pub video_limits: TypeLimits,
    pub project_text_limits: TypeLimits,
    pub portfolio_text_limits: TypeLimits,
    /// How often a blocked acquire re-checks the window
    pub acquire_poll_interval: Duration,
    /// Give up acquiring after this long
    pub acquire_timeout: Duration,
    /// Pause between project synthesis and portfolio synthesis, letting
    /// late writes land before the final read
    pub settle_delay: Duration,
    /// Directory for scratch video downloads
    pub scratch_dir: PathBuf,
    /// Socket timeout passed to yt-dlp
    pub download_timeout: Duration,
    /// Minimum age of the previous job before a portfolio may be reanalyzed
    pub min_reanalysis_interval: Duration,
    /// Maximum jobs per portfolio in a trailing 30 days
    pub monthly_job_limit: usize,
    /// Jobs stuck Processing longer than this are swept to Failed
    pub stale_job_threshold: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            image_limits: TypeLimits {
                requests_per_minute: 15,
                max_concurrent: 5,
            },
            video_limits: TypeLimits {
                requests_per_minute: 15,
                max_concurrent: 3,
            },
            project_text_limits: TypeLimits {
                requests_per_minute: 15,
                max_concurrent: 3,
            },
            portfolio_text_limits: TypeLimits {
                requests_per_minute: 15,
                max_concurrent: 2,
            },
            acquire_poll_interval: Duration::from_secs(1),
            acquire_timeout: Duration::from_secs(300),
            settle_delay: Duration::from_secs(5),
            scratch_dir: PathBuf::from("/tmp/folio-media"),
            download_timeout: Duration::from_secs(60),
            min_reanalysis_interval: Duration::from_secs(0),
            monthly_job_limit: 100,
            stale_job_threshold: Duration::from_secs(3600),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            image_limits: type_limits_from_env("IMAGE", defaults.image_limits),
            video_limits: type_limits_from_env("VIDEO", defaults.video_limits),
            project_text_limits: type_limits_from_env(
                "PROJECT_TEXT",
                defaults.project_text_limits,
            ),
            portfolio_text_limits: type_limits_from_env(
                "PORTFOLIO_TEXT",
                defaults.portfolio_text_limits,
            ),
            acquire_poll_interval: Duration::from_secs(
                env_parse("ENGINE_ACQUIRE_POLL_SECS").unwrap_or(1),
            ),
            acquire_timeout: Duration::from_secs(
                env_parse("ENGINE_ACQUIRE_TIMEOUT_SECS").unwrap_or(300),
            ),
            settle_delay: Duration::from_secs(env_parse("ENGINE_SETTLE_DELAY_SECS").unwrap_or(5)),
            scratch_dir: std::env::var("ENGINE_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            download_timeout: Duration::from_secs(
                env_parse("ENGINE_DOWNLOAD_TIMEOUT_SECS").unwrap_or(60),
            ),
            min_reanalysis_interval: Duration::from_secs(
                env_parse("ENGINE_MIN_REANALYSIS_SECS").unwrap_or(0),
            ),
            monthly_job_limit: env_parse("ENGINE_MONTHLY_JOB_LIMIT").unwrap_or(100),
            stale_job_threshold: Duration::from_secs(
                env_parse("ENGINE_STALE_JOB_SECS").unwrap_or(3600),
            ),
        }
    }

    /// Limits for a given content type.
    pub fn limits_for(&self, content_type: ContentType) -> TypeLimits {
        match content_type {
            ContentType::Image => self.image_limits,
            ContentType::Video => self.video_limits,
            ContentType::ProjectText => self.project_text_limits,
            ContentType::PortfolioText => self.portfolio_text_limits,
        }
    }
}

fn type_limits_from_env(prefix: &str, defaults: TypeLimits) -> TypeLimits {
    TypeLimits {
        requests_per_minute: env_parse(&format!("ENGINE_{prefix}_RPM"))
            .unwrap_or(defaults.requests_per_minute),
        max_concurrent: env_parse(&format!("ENGINE_{prefix}_CONCURRENCY"))
            .unwrap_or(defaults.max_concurrent),
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.image_limits.max_concurrent, 5);
        assert_eq!(config.video_limits.max_concurrent, 3);
        assert_eq!(config.limits_for(ContentType::PortfolioText).max_concurrent, 2);
        assert_eq!(config.acquire_poll_interval, Duration::from_secs(1));
        assert_eq!(config.acquire_timeout, Duration::from_secs(300));
    }
}
