//! Content types for rate limiting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dimensionality of the embedding vectors produced by the provider.
pub const EMBEDDING_DIM: usize = 768;

/// Rate-limiter bucket key.
///
/// Each content type gets an independent requests-per-minute window and
/// concurrency ceiling, so a burst of image analyses cannot starve the
/// project/portfolio synthesis calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Image inference (inline bytes)
    Image,
    /// Video inference (inline or file API)
    Video,
    /// Project-level text synthesis
    ProjectText,
    /// Portfolio-level text synthesis
    PortfolioText,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Image => "image",
            ContentType::Video => "video",
            ContentType::ProjectText => "project_text",
            ContentType::PortfolioText => "portfolio_text",
        }
    }

    /// All bucket keys, in no particular order.
    pub fn all() -> [ContentType; 4] {
        [
            ContentType::Image,
            ContentType::Video,
            ContentType::ProjectText,
            ContentType::PortfolioText,
        ]
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
