//! Source resolution and video download for the Folio analysis backend.
//!
//! This crate provides:
//! - Canonical source-URL resolution for media items (platform ID vs.
//!   resolution map vs. base URL)
//! - Scratch-file downloads with guaranteed cleanup
//! - yt-dlp invocation behind the `ExternalDownloader` trait so tests never
//!   spawn real processes

pub mod download;
pub mod error;
pub mod source;

pub use download::{ExternalDownloader, MediaFetcher, ScratchFile, YtDlp};
pub use error::{MediaError, MediaResult};
pub use source::{best_resolution_url, resolve_image_url, resolve_video_source, ResolvedSource};

#[cfg(feature = "mocks")]
pub use download::MockExternalDownloader;
