use std::fmt::Write as _;

use crate::{
    assistant::RewriteRequest,
    types::{AnalysisResult, VideoMetadata, non_blank},
};

pub static GRADING_PROMPT: &str = r#"You are a YouTube SEO expert. Grade the video metadata you are given and return actionable improvements.

You MUST output ONLY valid JSON matching this exact structure (no markdown, no explanation):
{
  "overallScore": <integer 0-100>,
  "summary": "2-3 sentence verdict on the metadata as a whole",
  "title": {
    "score": <integer 0-100>,
    "feedback": ["what works or fails in the title"],
    "recommendations": ["concrete change to make"],
    "suggestions": ["full alternative title", "full alternative title"]
  },
  "description": {
    "score": <integer 0-100>,
    "feedback": ["..."],
    "recommendations": ["..."],
    "suggestions": ["..."],
    "structuralSuggestions": [
      "Category | Title | Suggestion | Template: [ready-to-paste text]"
    ]
  },
  "tags": {
    "score": <integer 0-100>,
    "feedback": ["..."],
    "recommendations": ["..."],
    "suggestions": ["..."],
    "specificTags": ["tag one", "tag two"]
  },
  "competitiveAudit": {
    "userStrengths": ["..."],
    "competitorStrengths": ["..."],
    "gapAnalysis": "...",
    "strategicMove": "..."
  }
}

Rules:
- Scores are integers from 0 to 100
- structuralSuggestions lists description blocks that are missing or weak. Use one of these categories:
  ABOUT, SOCIAL LINKS, CTA, TIMESTAMPS, DISCLAIMER, OTHER. Separate the parts with " | " and put
  the ready-to-paste text after "Template:" inside square brackets
- When a script is provided, build TIMESTAMPS templates from it; respect the stated duration
- specificTags are 10-20 tags ready to paste, most relevant first
- Include competitiveAudit ONLY when competitor information is provided, otherwise omit the key
- Output ONLY the JSON, nothing else"#;

pub static REWRITE_PROMPT: &str = r#"You are a YouTube copywriter. Rewrite the video description you are given so that it applies every listed recommendation.

Rules:
- Keep the creator's voice, facts and links
- Put the hook and main keywords in the first two lines
- Add missing sections (about, links, call to action, chapters) only when they fit the video
- When a duration is given, keep chapter timestamps within it
- Output ONLY the new description text, no preamble and no markdown fences"#;

pub static INTELLIGENCE_PROMPT: &str = r#"You are a YouTube market analyst with web search access. Research the niche you are given using current sources.

Report on:
1. Trending topics and formats in the niche right now
2. Top channels and what makes their packaging (titles, thumbnails, descriptions) work
3. High-demand search keywords and under-served questions
4. Three concrete video ideas with suggested titles

Write a concise report in plain text with short headed sections."#;

pub static CHAT_PROMPT: &str = r#"You are a YouTube growth strategist helping a creator with one specific video.
Answer concisely and concretely. Refer to the video context below when relevant; if the creator asks for rewritten text, give ready-to-paste text."#;

/// User message for the grading call.
pub fn grading_user_prompt(metadata: &VideoMetadata) -> String {
    let mut prompt = String::from("Grade this YouTube video metadata.\n\n");
    let _ = writeln!(prompt, "TITLE:\n{}\n", metadata.title.trim());
    let _ = writeln!(prompt, "DESCRIPTION:\n{}\n", metadata.description.trim());
    let _ = writeln!(prompt, "TAGS:\n{}\n", or_none(&metadata.tags));
    let _ = writeln!(prompt, "DURATION:\n{}\n", or_none(&metadata.duration));

    if let Some(script) = non_blank(&metadata.script) {
        let _ = writeln!(prompt, "SCRIPT / TRANSCRIPT:\n{script}\n");
    }

    if metadata.has_competitor() {
        prompt.push_str("COMPETITOR (fill competitiveAudit):\n");
        if let Some(url) = non_blank(&metadata.competitor_url) {
            let _ = writeln!(prompt, "URL: {url}");
        }
        if let Some(notes) = non_blank(&metadata.competitor_notes) {
            let _ = writeln!(prompt, "Notes: {notes}");
        }
    }

    prompt.trim_end().to_string()
}

pub fn rewrite_user_prompt(request: &RewriteRequest) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "VIDEO TITLE:\n{}\n", request.title.trim());
    if let Some(duration) = &request.duration {
        let _ = writeln!(prompt, "DURATION:\n{duration}\n");
    }
    prompt.push_str("RECOMMENDATIONS TO APPLY:\n");
    for (i, rec) in request.recommendations.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}", i + 1, rec);
    }
    let _ = write!(
        prompt,
        "\nCURRENT DESCRIPTION:\n{}",
        request.description.trim()
    );
    prompt
}

pub fn intelligence_user_prompt(niche: &str) -> String {
    format!("Niche: {}", niche.trim())
}

/// Snapshot of the draft and analysis handed to the strategy assistant.
pub fn chat_context(metadata: &VideoMetadata, analysis: Option<&AnalysisResult>) -> String {
    let mut context = String::from("VIDEO CONTEXT\n");
    let _ = writeln!(context, "Title: {}", or_none(&metadata.title));
    let _ = writeln!(context, "Tags: {}", or_none(&metadata.tags));
    let _ = writeln!(context, "Duration: {}", or_none(&metadata.duration));
    let _ = writeln!(context, "Description:\n{}", or_none(&metadata.description));

    match analysis {
        Some(analysis) => {
            let _ = writeln!(
                context,
                "\nLATEST GRADING\nOverall: {}/100 (title {}, description {}, tags {})",
                analysis.overall_score,
                analysis.title.score,
                analysis.description.score,
                analysis.tags.score
            );
            if !analysis.summary.is_empty() {
                let _ = writeln!(context, "Summary: {}", analysis.summary);
            }
            for rec in analysis.recommendations() {
                let _ = writeln!(context, "- {rec}");
            }
        }
        None => context.push_str("\nThe video has not been graded yet.\n"),
    }

    context.trim_end().to_string()
}

fn or_none(value: &str) -> &str {
    let value = value.trim();
    if value.is_empty() { "(none)" } else { value }
}
