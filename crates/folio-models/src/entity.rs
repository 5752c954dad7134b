//! Analyzable media entities (images and videos).

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a media item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(pub String);

impl MediaId {
    /// Generate a new random media ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MediaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-entity analysis state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Not yet analyzed
    #[default]
    Pending,
    /// An analyzer currently owns this entity
    Processing,
    /// Analysis text and embedding persisted
    Success,
    /// Last attempt failed; a future job run may retry
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Success => "success",
            AnalysisStatus::Failed => "failed",
        }
    }

    /// Terminal for the current attempt. `Failed` entities stay retryable
    /// across job runs, unlike terminal job states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Success | AnalysisStatus::Failed)
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// External platform reference for a hosted video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoSource {
    /// Vimeo video ID
    Vimeo(String),
    /// YouTube video ID
    Youtube(String),
}

impl VideoSource {
    /// Canonical watch URL for the platform video.
    pub fn watch_url(&self) -> String {
        match self {
            VideoSource::Vimeo(id) => format!("https://vimeo.com/{}", id),
            VideoSource::Youtube(id) => format!("https://www.youtube.com/watch?v={}", id),
        }
    }
}

/// An image belonging to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAsset {
    /// Unique image ID
    pub id: MediaId,

    /// Owning project
    pub project_id: String,

    /// Creator who owns the portfolio tree
    pub creator_id: String,

    /// Base storage URL
    pub url: String,

    /// Map of resolution label (e.g. "1920") to URL
    #[serde(default)]
    pub resolutions: HashMap<String, String>,

    /// AI-generated analysis text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<String>,

    /// Embedding of the analysis text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Analysis state
    #[serde(default)]
    pub analysis_status: AnalysisStatus,

    /// Error message from the last failed attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_error: Option<String>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// A video belonging to a project.
///
/// Videos are either storage-hosted (plain `url`) or externally hosted
/// behind a platform ID in `source`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoAsset {
    /// Unique video ID
    pub id: MediaId,

    /// Owning project
    pub project_id: String,

    /// Creator who owns the portfolio tree
    pub creator_id: String,

    /// Base storage URL
    pub url: String,

    /// External platform reference, if the video is not storage-hosted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<VideoSource>,

    /// AI-generated analysis text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<String>,

    /// Embedding of the analysis text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Analysis state
    #[serde(default)]
    pub analysis_status: AnalysisStatus,

    /// Error message from the last failed attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_error: Option<String>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ImageAsset {
    /// Create a fresh, unanalyzed image.
    pub fn new(
        project_id: impl Into<String>,
        creator_id: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: MediaId::new(),
            project_id: project_id.into(),
            creator_id: creator_id.into(),
            url: url.into(),
            resolutions: HashMap::new(),
            ai_analysis: None,
            embedding: None,
            analysis_status: AnalysisStatus::Pending,
            analysis_error: None,
            updated_at: Utc::now(),
        }
    }

    /// True when both analysis fields are populated.
    ///
    /// The status enum is the primary skip signal; this is the defensive
    /// double-check for rows written before the enum existed.
    pub fn is_analyzed(&self) -> bool {
        self.ai_analysis.is_some() && self.embedding.is_some()
    }
}

impl VideoAsset {
    /// Create a fresh, unanalyzed video.
    pub fn new(
        project_id: impl Into<String>,
        creator_id: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: MediaId::new(),
            project_id: project_id.into(),
            creator_id: creator_id.into(),
            url: url.into(),
            source: None,
            ai_analysis: None,
            embedding: None,
            analysis_status: AnalysisStatus::Pending,
            analysis_error: None,
            updated_at: Utc::now(),
        }
    }

    /// Attach an external platform source.
    pub fn with_source(mut self, source: VideoSource) -> Self {
        self.source = Some(source);
        self
    }

    /// True when both analysis fields are populated.
    pub fn is_analyzed(&self) -> bool {
        self.ai_analysis.is_some() && self.embedding.is_some()
    }
}
