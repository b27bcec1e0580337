use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata of one video as the creator is editing it.
///
/// `tags` keeps the raw comma-separated field; see [`crate::tags`] for the
/// set semantics layered on top of it. `duration` is display text only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: String,
    pub duration: String,
    pub script: Option<String>,
    pub competitor_url: Option<String>,
    pub competitor_notes: Option<String>,
}

impl VideoMetadata {
    pub fn has_competitor(&self) -> bool {
        non_blank(&self.competitor_url).is_some() || non_blank(&self.competitor_notes).is_some()
    }
}

pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingDetails {
    pub score: u8,
    #[serde(default)]
    pub feedback: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structural_suggestions: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitiveAudit {
    #[serde(default)]
    pub user_strengths: Vec<String>,
    #[serde(default)]
    pub competitor_strengths: Vec<String>,
    #[serde(default)]
    pub gap_analysis: String,
    #[serde(default)]
    pub strategic_move: String,
}

/// Structured SEO report returned by the grading call. Never mutated after
/// it is produced; saving takes a copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub overall_score: u8,
    #[serde(default)]
    pub summary: String,
    pub title: GradingDetails,
    pub description: GradingDetails,
    pub tags: GradingDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitive_audit: Option<CompetitiveAudit>,
}

impl AnalysisResult {
    /// All recommendations in title, description, tags order.
    pub fn recommendations(&self) -> impl Iterator<Item = &String> {
        self.title
            .recommendations
            .iter()
            .chain(&self.description.recommendations)
            .chain(&self.tags.recommendations)
    }

    pub(crate) fn scores(&self) -> [(&'static str, u8); 4] {
        [
            ("overallScore", self.overall_score),
            ("title.score", self.title.score),
            ("description.score", self.description.score),
            ("tags.score", self.tags.score),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedGrading {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub metadata: VideoMetadata,
    pub analysis: AnalysisResult,
}

impl SavedGrading {
    pub fn new(metadata: VideoMetadata, analysis: AnalysisResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            metadata,
            analysis,
        }
    }
}

/// One structural suggestion split into its display parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionItem {
    pub category: String,
    pub title: String,
    pub description: String,
    pub template: String,
    pub original_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub uri: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntelligenceResult {
    pub text: String,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn name(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}
