//! Engine error types.

use thiserror::Error;

use folio_models::ContentType;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Rate limit acquire timed out for {content_type} after {waited_secs}s")]
    RateLimitTimeout {
        content_type: ContentType,
        waited_secs: u64,
    },

    #[error("Embedding failed for {entity}: {source}")]
    EmbeddingFailed {
        entity: String,
        #[source]
        source: folio_gemini::ProviderError,
    },

    #[error("Reanalysis denied: {0}")]
    ReanalysisDenied(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Portfolio not found: {0}")]
    PortfolioNotFound(String),

    #[error("Nothing to analyze")]
    NothingToAnalyze,

    #[error("Store error: {0}")]
    Store(#[from] folio_store::StoreError),

    #[error("Media error: {0}")]
    Media(#[from] folio_media::MediaError),

    #[error("Provider error: {0}")]
    Provider(#[from] folio_gemini::ProviderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Check if error is retryable by a later job run.
    ///
    /// Rate-limit timeouts and transient store/provider failures may clear
    /// up; download failures and provider verdicts about the input will
    /// not, at least not without operator action.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::RateLimitTimeout { .. } => true,
            EngineError::Store(e) => e.is_retryable(),
            EngineError::Provider(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Check if this is a permanent failure no retry will fix.
    pub fn is_permanent(&self) -> bool {
        matches!(self, EngineError::Provider(e) if e.is_permanent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let timeout = EngineError::RateLimitTimeout {
            content_type: ContentType::Image,
            waited_secs: 300,
        };
        assert!(timeout.is_retryable());

        let too_large = EngineError::Provider(folio_gemini::ProviderError::FileTooLarge {
            size: 3,
            limit: 2,
        });
        assert!(too_large.is_permanent());
        assert!(!too_large.is_retryable());

        let download = EngineError::Media(folio_media::MediaError::download_failed("boom"));
        assert!(!download.is_retryable());
    }
}
