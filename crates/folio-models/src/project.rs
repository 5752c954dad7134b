//! Project and portfolio aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::AnalysisStatus;

/// A project: mid-level aggregate owning media items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique project ID
    pub id: String,

    /// Project title
    pub title: String,

    /// Project description
    #[serde(default)]
    pub description: String,

    /// Owning portfolio
    pub portfolio_id: String,

    /// Synthesized analysis over successful child media
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<String>,

    /// Embedding of the synthesized analysis
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

/// A portfolio: root aggregate owning projects, belonging to one creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    /// Unique portfolio ID
    pub id: String,

    /// Owning creator
    pub creator_id: String,

    /// Portfolio title
    pub title: String,

    /// Synthesized analysis over successful child projects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<String>,

    /// Embedding of the synthesized analysis
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

/// Creator context blended into portfolio-level synthesis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatorContext {
    pub username: String,
    #[serde(default)]
    pub primary_role: String,
    #[serde(default)]
    pub bio: String,
}

impl Project {
    /// Create a fresh, unanalyzed project.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        portfolio_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            portfolio_id: portfolio_id.into(),
            ai_analysis: None,
            embedding: None,
            analysis_status: AnalysisStatus::Pending,
            analysis_error: None,
            updated_at: Utc::now(),
        }
    }

    /// True when both analysis fields are populated.
    pub fn is_analyzed(&self) -> bool {
        self.ai_analysis.is_some() && self.embedding.is_some()
    }
}

impl Portfolio {
    /// Create a fresh, unanalyzed portfolio.
    pub fn new(
        id: impl Into<String>,
        creator_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            creator_id: creator_id.into(),
            title: title.into(),
            ai_analysis: None,
            embedding: None,
            analysis_status: AnalysisStatus::Pending,
            analysis_error: None,
            updated_at: Utc::now(),
        }
    }

    /// True when both analysis fields are populated.
    pub fn is_analyzed(&self) -> bool {
        self.ai_analysis.is_some() && self.embedding.is_some()
    }
}
