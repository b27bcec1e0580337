//! Vidgrade Core Library
//!
//! Core functionality for grading YouTube video metadata with an AI model,
//! turning the report into actionable suggestions, and keeping the draft and
//! saved gradings on disk.

pub mod assistant;
pub mod config;
pub mod error;
pub mod format;
pub mod grouping;
pub mod llm;
pub mod paths;
pub mod prompts;
pub mod provider;
pub mod session;
pub mod store;
pub mod suggestion;
pub mod tags;
pub mod types;

// Re-export commonly used items at crate root
pub use assistant::{ChatRequest, RewriteRequest, SeoAssistant, TextStream};
pub use config::Settings;
pub use error::{Result, VidgradeError};
pub use format::{format_history, format_intelligence, format_report_readable, score_label};
pub use grouping::{GroupedSuggestions, SuggestionContext, SuggestionGroup, group_suggestions};
pub use llm::LlmAssistant;
pub use paths::{get_config_path, get_root_data_dir};
pub use provider::{Provider, ProviderConfig, ProviderError};
pub use session::{AnalysisSession, Completion, RequestTicket, SaveOutcome, SessionState};
pub use store::{FileStore, KeyValueStore, MemoryStore, Store};
pub use suggestion::parse_suggestion;
pub use tags::{add_tag, is_tag_added};
pub use types::{
    AnalysisResult, ChatRole, ChatTurn, CompetitiveAudit, GradingDetails, IntelligenceResult,
    SavedGrading, Source, SuggestionItem, Theme, VideoMetadata,
};
