//! Provider error types.

use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors returned by the generative-AI provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered, but with blank text. Never stored.
    #[error("Provider returned an empty analysis")]
    EmptyAnalysis,

    /// File exceeds the hard file-API ceiling. Permanent; never attempted.
    #[error("File too large for analysis: {size} bytes (limit {limit})")]
    FileTooLarge { size: u64, limit: u64 },

    /// The file API reported a terminal `FAILED` processing state.
    #[error("Provider file processing failed: {0}")]
    ProcessingFailed(String),

    /// The file API never reached `ACTIVE` within the attempt budget.
    #[error("Provider file processing timed out after {attempts} polls")]
    ProcessingTimeout { attempts: u32 },

    #[error("Provider request returned {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Check if a fresh attempt could plausibly succeed.
    ///
    /// Rate limiting (429) and server errors are retryable; everything the
    /// provider decided about the input itself is terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network(_) => true,
            ProviderError::RequestFailed { status, .. } => {
                *status == 429 || *status >= 500
            }
            _ => false,
        }
    }

    /// Permanent failures where no retry will ever help.
    pub fn is_permanent(&self) -> bool {
        matches!(self, ProviderError::FileTooLarge { .. })
    }
}
