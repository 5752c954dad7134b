//! Entity analyzers.
//!
//! Every analyzer follows the same state machine: skip if already done,
//! mark `Processing`, acquire a rate-limiter permit, build the provider
//! input, call the provider, embed, then persist text + embedding + Success
//! in one write. On any failure the entity is marked `Failed` with the
//! error message and the error propagates; the orchestrator records it and
//! keeps processing siblings.

mod image;
mod portfolio;
mod project;
mod video;

pub use image::analyze_image;
pub use portfolio::analyze_portfolio;
pub use project::analyze_project;
pub use video::analyze_video;

use std::sync::Arc;

use tracing::warn;

use folio_gemini::AnalysisProvider;
use folio_media::MediaFetcher;
use folio_store::{ImageStore, JobStore, PortfolioStore, ProjectStore, VideoStore};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::rate_limit::RateLimiter;

/// Shared dependencies for all analyzers, wired once per engine.
#[derive(Clone)]
pub struct AnalyzerContext {
    pub jobs: Arc<dyn JobStore>,
    pub images: Arc<dyn ImageStore>,
    pub videos: Arc<dyn VideoStore>,
    pub projects: Arc<dyn ProjectStore>,
    pub portfolios: Arc<dyn PortfolioStore>,
    pub provider: Arc<dyn AnalysisProvider>,
    pub limiter: Arc<RateLimiter>,
    pub fetcher: Arc<MediaFetcher>,
    pub config: EngineConfig,
}

/// What an analyzer did with an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Fresh analysis persisted
    Analyzed,
    /// Already `Success`; nothing touched
    SkippedDone,
    /// No input to synthesize from yet; nothing touched
    SkippedNothing,
}

/// Embed analysis text, discarding the text on failure.
///
/// A successful analysis whose embedding fails is never persisted half-done;
/// the text is logged at warn level so an operator can recover it, and the
/// entity ends up `Failed`.
pub(crate) async fn embed_text(
    ctx: &AnalyzerContext,
    entity: &str,
    text: &str,
) -> EngineResult<Vec<f32>> {
    match ctx.provider.embed(text.to_string()).await {
        Ok(embedding) => Ok(embedding),
        Err(e) => {
            warn!(
                entity = %entity,
                error = %e,
                analysis = %text,
                "Embedding failed; discarding analysis text"
            );
            Err(EngineError::EmbeddingFailed {
                entity: entity.to_string(),
                source: e,
            })
        }
    }
}
