//! Canonical source-URL resolution for media items.
//!
//! Priority order: explicit external platform ID, then the
//! highest-resolution entry in the resolutions map, then the base URL.

use std::collections::HashMap;

use folio_models::{ImageAsset, VideoAsset};

use crate::error::{MediaError, MediaResult};

/// A resolved media source and the download strategy it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSource {
    /// Storage-hosted file, fetched with a direct streamed GET.
    Direct(String),
    /// External platform link, fetched through the external downloader.
    Platform(String),
}

impl ResolvedSource {
    pub fn url(&self) -> &str {
        match self {
            ResolvedSource::Direct(u) | ResolvedSource::Platform(u) => u,
        }
    }
}

/// Pick the URL under the numerically-largest resolution key.
///
/// Keys that do not parse as integers and values that are not valid
/// http(s) URLs are skipped; a map full of malformed entries yields `None`.
pub fn best_resolution_url(resolutions: &HashMap<String, String>) -> Option<String> {
    resolutions
        .iter()
        .filter_map(|(key, value)| {
            let size: u32 = key.trim().parse().ok()?;
            let parsed = url::Url::parse(value).ok()?;
            match parsed.scheme() {
                "http" | "https" => Some((size, value.clone())),
                _ => None,
            }
        })
        .max_by_key(|(size, _)| *size)
        .map(|(_, url)| url)
}

/// Resolve the source URL for an image.
pub fn resolve_image_url(image: &ImageAsset) -> MediaResult<String> {
    if let Some(best) = best_resolution_url(&image.resolutions) {
        return Ok(best);
    }
    if !image.url.trim().is_empty() {
        return Ok(image.url.clone());
    }
    Err(MediaError::no_source(format!("image {}", image.id)))
}

/// Resolve the source for a video.
///
/// Platform-hosted videos go through the external downloader; everything
/// else is a direct storage URL.
pub fn resolve_video_source(video: &VideoAsset) -> MediaResult<ResolvedSource> {
    if let Some(source) = &video.source {
        return Ok(ResolvedSource::Platform(source.watch_url()));
    }
    if !video.url.trim().is_empty() {
        return Ok(ResolvedSource::Direct(video.url.clone()));
    }
    Err(MediaError::no_source(format!("video {}", video.id)))
}
