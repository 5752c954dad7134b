//! Shared data models for the Folio analysis backend.
//!
//! This crate provides Serde-serializable types for:
//! - Analysis jobs and their lifecycle
//! - Analyzable entities (images, videos, projects, portfolios)
//! - Per-entity analysis status
//! - Rate-limiter content types

pub mod content;
pub mod entity;
pub mod job;
pub mod project;

// Re-export common types
pub use content::{ContentType, EMBEDDING_DIM};
pub use entity::{AnalysisStatus, ImageAsset, MediaId, VideoAsset, VideoSource};
pub use job::{AnalysisJob, JobId, JobStatus};
pub use project::{CreatorContext, Portfolio, Project};
