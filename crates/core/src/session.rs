//! The analysis session: one editing session over a draft, its latest
//! grading and the saved history.
//!
//! ```text
//! Idle -> Submitting -> Graded <-> Rewriting
//!              \-> Failed
//! any  -> Idle (new_analysis)
//! ```
//!
//! Collaborator failures never escape as panics or leave the session
//! loading: each action records a user-facing message in [`error`] and
//! returns to the last stable state, so the same action can be retried.
//!
//! Requests are split into `begin_*`/`finish_*` pairs carrying a
//! [`RequestTicket`]. A ticket issued before the latest [`new_analysis`]
//! (or [`open_saved`]) is stale and its result is dropped.
//!
//! [`error`]: AnalysisSession::error
//! [`new_analysis`]: AnalysisSession::new_analysis
//! [`open_saved`]: AnalysisSession::open_saved

use futures::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    assistant::{ChatRequest, RewriteRequest, SeoAssistant},
    error::{Result, VidgradeError},
    grouping::{GroupedSuggestions, SuggestionContext, group_for_context},
    prompts::chat_context,
    store::{KeyValueStore, Store},
    tags::{add_tag, missing_tags},
    types::{
        AnalysisResult, ChatRole, ChatTurn, IntelligenceResult, SavedGrading, SuggestionItem,
        Theme, VideoMetadata,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Submitting,
    Graded,
    Failed,
    Rewriting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    Grade,
    Rewrite,
}

/// Issued by `begin_*`, handed back to the matching `finish_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    generation: u64,
    kind: RequestKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The session was reset after the request started; the result was dropped.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(Uuid),
    AlreadySaved,
    NoAnalysis,
}

/// The graded metadata snapshot together with its report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentAnalysis {
    pub metadata: VideoMetadata,
    pub analysis: AnalysisResult,
}

pub struct AnalysisSession<A, S> {
    assistant: A,
    store: Store<S>,
    draft: VideoMetadata,
    state: SessionState,
    current: Option<CurrentAnalysis>,
    pending_metadata: Option<VideoMetadata>,
    improved_description: Option<String>,
    error: Option<String>,
    generation: u64,
    chat: Vec<ChatTurn>,
    /// Current analysis came from history and the draft was left alone.
    viewing_saved: bool,
}

impl<A: SeoAssistant, S: KeyValueStore> AnalysisSession<A, S> {
    /// Start a session, restoring the persisted draft.
    pub fn new(assistant: A, store: Store<S>) -> Self {
        let draft = store.load_draft();
        Self {
            assistant,
            store,
            draft,
            state: SessionState::Idle,
            current: None,
            pending_metadata: None,
            improved_description: None,
            error: None,
            generation: 0,
            chat: Vec::new(),
            viewing_saved: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn draft(&self) -> &VideoMetadata {
        &self.draft
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.current.as_ref().map(|c| &c.analysis)
    }

    pub fn current(&self) -> Option<&CurrentAnalysis> {
        self.current.as_ref()
    }

    pub fn improved_description(&self) -> Option<&str> {
        self.improved_description.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn history(&self) -> &[SavedGrading] {
        self.store.history()
    }

    pub fn chat_transcript(&self) -> &[ChatTurn] {
        &self.chat
    }

    pub fn clear_chat(&mut self) {
        self.chat.clear();
    }

    pub fn assistant(&self) -> &A {
        &self.assistant
    }

    pub fn theme(&self) -> Theme {
        self.store.load_theme()
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.store.save_theme(theme)
    }

    fn fail<T>(&mut self, err: VidgradeError) -> Result<T> {
        self.error = Some(err.user_message());
        Err(err)
    }

    // Draft editing

    /// Apply an edit to the draft and persist it.
    pub fn update_draft(&mut self, edit: impl FnOnce(&mut VideoMetadata)) -> Result<()> {
        edit(&mut self.draft);
        if let Err(e) = self.store.save_draft(&self.draft) {
            warn!(error = %e, "failed to persist draft");
            return Err(e);
        }
        Ok(())
    }

    /// Empty the draft and erase its stored record.
    pub fn reset_draft(&mut self) -> Result<()> {
        self.draft = VideoMetadata::default();
        self.store.clear_draft()
    }

    /// Add a recommended tag to the draft. Returns whether the field changed.
    pub fn apply_tag(&mut self, tag: &str) -> Result<bool> {
        let tags = add_tag(tag, &self.draft.tags);
        if tags == self.draft.tags {
            return Ok(false);
        }
        self.update_draft(|draft| draft.tags = tags)?;
        Ok(true)
    }

    /// Append a structural suggestion's template to the draft description.
    pub fn apply_template(&mut self, item: &SuggestionItem) -> Result<bool> {
        let template = item.template.trim();
        if template.is_empty() || self.draft.description.contains(template) {
            return Ok(false);
        }

        let description = match self.draft.description.trim_end() {
            "" => template.to_string(),
            existing => format!("{existing}\n\n{template}"),
        };
        self.update_draft(|draft| draft.description = description)?;
        Ok(true)
    }

    /// Replace the draft description with the rewrite result, if there is one.
    ///
    /// When the analysis was opened with [`Self::view_saved`], the saved
    /// metadata becomes the draft first.
    pub fn apply_improved_description(&mut self) -> Result<bool> {
        let Some(improved) = self.improved_description.clone() else {
            return Ok(false);
        };
        let restore = match &self.current {
            Some(current) if self.viewing_saved => Some(current.metadata.clone()),
            _ => None,
        };
        self.update_draft(|draft| {
            if let Some(metadata) = restore {
                *draft = metadata;
            }
            draft.description = improved;
        })?;
        self.viewing_saved = false;
        Ok(true)
    }

    /// Metadata the current analysis should be read against.
    fn working_metadata(&self) -> &VideoMetadata {
        match &self.current {
            Some(current) if self.viewing_saved => &current.metadata,
            _ => &self.draft,
        }
    }

    // Grading

    pub fn begin_submit(&mut self) -> Result<(RequestTicket, VideoMetadata)> {
        if matches!(self.state, SessionState::Submitting | SessionState::Rewriting) {
            return self.fail(VidgradeError::validation(
                "Another request is still in progress",
            ));
        }
        if self.draft.title.trim().is_empty() || self.draft.description.trim().is_empty() {
            return self.fail(VidgradeError::validation(
                "Please provide at least a title and description",
            ));
        }

        self.state = SessionState::Submitting;
        self.error = None;
        self.pending_metadata = Some(self.draft.clone());
        info!(generation = self.generation, "grading submitted");

        Ok((
            RequestTicket {
                generation: self.generation,
                kind: RequestKind::Grade,
            },
            self.draft.clone(),
        ))
    }

    /// A failure falls back to `Graded` when an earlier analysis is still
    /// shown, otherwise to `Failed`.
    pub fn finish_submit(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<AnalysisResult>,
    ) -> Result<Completion> {
        if !self.is_current(ticket, RequestKind::Grade, SessionState::Submitting) {
            debug!(?ticket, "dropping stale grading result");
            return Ok(Completion::Stale);
        }
        let metadata = self.pending_metadata.take().unwrap_or_else(|| self.draft.clone());

        match outcome {
            Ok(analysis) => {
                info!(score = analysis.overall_score, "grading completed");
                self.current = Some(CurrentAnalysis { metadata, analysis });
                self.improved_description = None;
                self.viewing_saved = false;
                self.state = SessionState::Graded;
                Ok(Completion::Applied)
            }
            Err(e) => {
                warn!(error = %e, "grading failed");
                self.state = if self.current.is_some() {
                    SessionState::Graded
                } else {
                    SessionState::Failed
                };
                self.fail(e)
            }
        }
    }

    pub async fn submit(&mut self) -> Result<&AnalysisResult> {
        let (ticket, metadata) = self.begin_submit()?;
        let outcome = self.assistant.grade(&metadata).await;
        self.finish_submit(ticket, outcome)?;
        self.analysis().ok_or(VidgradeError::NoAnalysis)
    }

    // Rewrite

    pub fn begin_rewrite(&mut self) -> Result<(RequestTicket, RewriteRequest)> {
        let request = match &self.current {
            Some(current) if self.state == SessionState::Graded => {
                RewriteRequest::from_analysis(self.working_metadata(), &current.analysis)
            }
            Some(_) => {
                return self.fail(VidgradeError::validation(
                    "Another request is still in progress",
                ));
            }
            None => return self.fail(VidgradeError::NoAnalysis),
        };
        self.state = SessionState::Rewriting;
        self.error = None;

        Ok((
            RequestTicket {
                generation: self.generation,
                kind: RequestKind::Rewrite,
            },
            request,
        ))
    }

    /// Always returns to `Graded`; the analysis survives a failed rewrite.
    pub fn finish_rewrite(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<String>,
    ) -> Result<Completion> {
        if !self.is_current(ticket, RequestKind::Rewrite, SessionState::Rewriting) {
            debug!(?ticket, "dropping stale rewrite result");
            return Ok(Completion::Stale);
        }
        self.state = SessionState::Graded;

        match outcome {
            Ok(text) if text.trim().is_empty() => self.fail(VidgradeError::malformed(
                "rewrite",
                "the rewritten description is empty",
            )),
            Ok(text) => {
                self.improved_description = Some(text);
                Ok(Completion::Applied)
            }
            Err(e) => {
                warn!(error = %e, "rewrite failed");
                self.fail(e)
            }
        }
    }

    pub async fn rewrite(&mut self) -> Result<&str> {
        let (ticket, request) = self.begin_rewrite()?;
        let outcome = self.assistant.rewrite_description(&request).await;
        self.finish_rewrite(ticket, outcome)?;
        self.improved_description().ok_or(VidgradeError::NoAnalysis)
    }

    fn is_current(&self, ticket: RequestTicket, kind: RequestKind, state: SessionState) -> bool {
        ticket.generation == self.generation && ticket.kind == kind && self.state == state
    }

    /// Back to `Idle`. History and the draft are kept.
    pub fn new_analysis(&mut self) {
        self.generation += 1;
        self.state = SessionState::Idle;
        self.current = None;
        self.pending_metadata = None;
        self.improved_description = None;
        self.error = None;
        self.viewing_saved = false;
    }

    // History

    /// Same title and same overall score as an existing entry counts as
    /// already saved.
    pub fn is_already_saved(&self) -> bool {
        let Some(current) = &self.current else {
            return false;
        };
        self.store.history().iter().any(|entry| {
            entry.metadata.title == current.metadata.title
                && entry.analysis.overall_score == current.analysis.overall_score
        })
    }

    pub fn save_current(&mut self) -> Result<SaveOutcome> {
        let Some(current) = &self.current else {
            return Ok(SaveOutcome::NoAnalysis);
        };
        if self.is_already_saved() {
            return Ok(SaveOutcome::AlreadySaved);
        }

        let entry = SavedGrading::new(current.metadata.clone(), current.analysis.clone());
        let id = entry.id;
        if let Err(e) = self.store.append_saved(entry).map(|_| ()) {
            return self.fail(e);
        }
        Ok(SaveOutcome::Saved(id))
    }

    pub fn delete_saved(&mut self, id: Uuid) -> Result<()> {
        if let Err(e) = self.store.remove_saved(id).map(|_| ()) {
            return self.fail(e);
        }
        Ok(())
    }

    /// Show a saved grading as the current analysis and restore its metadata as the draft.
    pub fn open_saved(&mut self, id: Uuid) -> Result<&AnalysisResult> {
        let metadata = self.load_saved(id)?;
        self.update_draft(|draft| *draft = metadata)?;
        self.analysis().ok_or(VidgradeError::NoAnalysis)
    }

    /// Show a saved grading as the current analysis without touching the draft.
    ///
    /// Rewrite, chat context and missing tags read the saved metadata until
    /// [`Self::apply_improved_description`] or a new grading.
    pub fn view_saved(&mut self, id: Uuid) -> Result<&AnalysisResult> {
        self.load_saved(id)?;
        self.viewing_saved = true;
        self.analysis().ok_or(VidgradeError::NoAnalysis)
    }

    fn load_saved(&mut self, id: Uuid) -> Result<VideoMetadata> {
        let Some(entry) = self.store.find_saved(id).cloned() else {
            return self.fail(VidgradeError::validation(format!(
                "No saved grading with id {id}"
            )));
        };

        self.new_analysis();
        self.current = Some(CurrentAnalysis {
            metadata: entry.metadata.clone(),
            analysis: entry.analysis,
        });
        self.state = SessionState::Graded;
        Ok(entry.metadata)
    }

    // Derived views

    /// Grouped description structural suggestions of the current analysis.
    pub fn suggestion_groups(&self) -> Option<GroupedSuggestions> {
        let analysis = self.analysis()?;
        group_for_context(
            SuggestionContext::Description,
            analysis.description.structural_suggestions.as_deref(),
        )
    }

    /// Recommended tags not yet present in the draft.
    pub fn missing_tags(&self) -> Vec<String> {
        let Some(recommended) = self.analysis().and_then(|a| a.tags.specific_tags.as_ref()) else {
            return Vec::new();
        };
        missing_tags(recommended, &self.working_metadata().tags)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    // Side channels

    /// Niche research; never changes the analysis state.
    pub async fn market_intelligence(&mut self, niche: &str) -> Result<IntelligenceResult> {
        if niche.trim().is_empty() {
            return self.fail(VidgradeError::validation("Please describe a niche to research"));
        }
        match self.assistant.market_intelligence(niche.trim()).await {
            Ok(result) => {
                self.error = None;
                Ok(result)
            }
            Err(e) => self.fail(e),
        }
    }

    /// Send a chat message and stream the reply through `on_delta`.
    ///
    /// If the stream breaks, the partial reply stays in the transcript and
    /// is returned inside [`VidgradeError::StreamInterrupted`].
    pub async fn send_chat(
        &mut self,
        message: &str,
        mut on_delta: impl FnMut(&str),
    ) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return self.fail(VidgradeError::validation("Please enter a message"));
        }

        let request = ChatRequest {
            history: self.chat.clone(),
            message: message.to_string(),
            context: chat_context(self.working_metadata(), self.analysis()),
        };
        let mut stream = match self.assistant.chat(request).await {
            Ok(stream) => stream,
            Err(e) => return self.fail(e),
        };

        self.chat.push(ChatTurn {
            role: ChatRole::User,
            text: message.to_string(),
        });

        let mut reply = String::new();
        while let Some(delta) = stream.next().await {
            match delta {
                Ok(text) => {
                    on_delta(&text);
                    reply.push_str(&text);
                }
                Err(e) => {
                    let reason = match e {
                        VidgradeError::StreamInterrupted { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    if !reply.is_empty() {
                        self.chat.push(ChatTurn {
                            role: ChatRole::Model,
                            text: reply.clone(),
                        });
                    }
                    return self.fail(VidgradeError::StreamInterrupted {
                        partial: reply,
                        reason,
                    });
                }
            }
        }

        if reply.is_empty() {
            return self.fail(VidgradeError::malformed("strategy chat", "empty reply"));
        }

        self.chat.push(ChatTurn {
            role: ChatRole::Model,
            text: reply.clone(),
        });
        self.error = None;
        Ok(reply)
    }
}
