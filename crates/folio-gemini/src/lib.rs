//! Gemini API client for the Folio analysis backend.
//!
//! This crate provides:
//! - Text, image and video inference via `generateContent`
//! - Large-file upload + poll through the Gemini file API
//! - Embedding generation via `embedContent`
//! - Provider error classification (retryable vs. terminal)
//!
//! The engine consumes the [`AnalysisProvider`] trait, never the concrete
//! client, so tests run without network access.

pub mod client;
pub mod error;
pub mod provider;

pub use client::{GeminiClient, GeminiConfig};
pub use error::{ProviderError, ProviderResult};
pub use provider::AnalysisProvider;

#[cfg(feature = "mocks")]
pub use provider::MockAnalysisProvider;
