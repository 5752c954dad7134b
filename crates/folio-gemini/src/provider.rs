//! The provider trait consumed by the analysis engine.

use std::path::Path;

use crate::error::ProviderResult;

/// Opaque generative-AI provider: inference plus embeddings.
///
/// All methods treat blank response text as [`ProviderError::EmptyAnalysis`]
/// (never returned as success), and classify their failures as retryable or
/// terminal via `ProviderError::is_retryable`.
///
/// [`ProviderError::EmptyAnalysis`]: crate::error::ProviderError::EmptyAnalysis
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait::async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Describe an image given its raw bytes.
    async fn analyze_image(
        &self,
        bytes: Vec<u8>,
        mime: String,
        prompt: String,
    ) -> ProviderResult<String>;

    /// Describe a local video file, inlining small files and routing large
    /// ones through the provider's file API.
    async fn analyze_video(&self, path: &Path, prompt: String) -> ProviderResult<String>;

    /// Plain text-to-text inference.
    async fn analyze_text(&self, prompt: String) -> ProviderResult<String>;

    /// Embed text into a fixed-dimensionality vector.
    async fn embed(&self, text: String) -> ProviderResult<Vec<f32>>;
}
