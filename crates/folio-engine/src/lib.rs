//! Analysis orchestration engine.
//!
//! This crate provides:
//! - A per-content-type rate limiter (sliding window + concurrency gate)
//! - Entity analyzers for images, videos, projects and portfolios
//! - The job orchestrator driving a portfolio run through its stages
//! - Reanalysis gating consulted by the API entrypoint
//! - A stale-job sweep for crash recovery

pub mod analyzer;
pub mod config;
pub mod error;
pub mod gate;
pub mod logging;
pub mod orchestrator;
pub mod prompt;
pub mod rate_limit;

pub use analyzer::{AnalyzerContext, Outcome};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use gate::ReanalysisGate;
pub use logging::JobLogger;
pub use orchestrator::{sweep_stale_jobs, JobOrchestrator};
pub use rate_limit::{RateLimitPermit, RateLimiter};
