//! The remote model behind grading, rewriting, market research and chat.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{
    error::Result,
    types::{AnalysisResult, ChatTurn, IntelligenceResult, VideoMetadata},
};

/// Most recommendations handed to a rewrite.
pub const MAX_REWRITE_RECOMMENDATIONS: usize = 10;

/// Incremental reply text. Finite and consumed once.
pub type TextStream = BoxStream<'static, Result<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRequest {
    pub description: String,
    pub title: String,
    pub recommendations: Vec<String>,
    pub duration: Option<String>,
}

impl RewriteRequest {
    pub fn from_analysis(metadata: &VideoMetadata, analysis: &AnalysisResult) -> Self {
        let duration = metadata.duration.trim();
        Self {
            description: metadata.description.clone(),
            title: metadata.title.clone(),
            recommendations: analysis
                .recommendations()
                .take(MAX_REWRITE_RECOMMENDATIONS)
                .cloned()
                .collect(),
            duration: (!duration.is_empty()).then(|| duration.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub history: Vec<ChatTurn>,
    pub message: String,
    pub context: String,
}

#[async_trait]
pub trait SeoAssistant: Send + Sync {
    async fn grade(&self, metadata: &VideoMetadata) -> Result<AnalysisResult>;

    async fn rewrite_description(&self, request: &RewriteRequest) -> Result<String>;

    async fn market_intelligence(&self, niche: &str) -> Result<IntelligenceResult>;

    async fn chat(&self, request: ChatRequest) -> Result<TextStream>;
}
