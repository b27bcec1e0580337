//! [`SeoAssistant`] over an OpenAI-compatible HTTP API.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    assistant::{ChatRequest, RewriteRequest, SeoAssistant, TextStream},
    config::Settings,
    error::{Result, VidgradeError},
    prompts::{
        CHAT_PROMPT, GRADING_PROMPT, INTELLIGENCE_PROMPT, REWRITE_PROMPT, grading_user_prompt,
        intelligence_user_prompt, rewrite_user_prompt,
    },
    provider::Provider,
    types::{AnalysisResult, ChatRole, IntelligenceResult, Source, VideoMetadata},
};

const GRADING: &str = "grading";
const REWRITE: &str = "rewrite";
const INTELLIGENCE: &str = "market intelligence";
const CHAT: &str = "strategy chat";

/// Longest error body kept in [`VidgradeError::ServiceFailed`].
const MAX_ERROR_BODY: usize = 500;

pub struct LlmAssistant {
    provider: Provider,
    api_key: String,
    model: String,
    temperature: f32,
    http: reqwest::Client,
}

impl LlmAssistant {
    pub fn new(provider: Provider, settings: &Settings) -> Result<Self> {
        let api_key = provider.validate_api_key()?;
        let model = settings
            .model
            .clone()
            .unwrap_or_else(|| provider.config().model.to_string());

        Ok(Self {
            provider,
            api_key,
            model,
            temperature: settings.temperature(),
            http: reqwest::Client::new(),
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, service: &'static str, url: &str, body: &Value) -> Result<reqwest::Response> {
        debug!(service, url, model = %self.model, "sending request");

        let response = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VidgradeError::ServiceFailed {
                service,
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }
        Ok(response)
    }

    async fn post_json(&self, service: &'static str, url: &str, body: &Value) -> Result<Value> {
        self.send(service, url, body)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| VidgradeError::malformed(service, e.to_string()))
    }

    async fn chat_completion(
        &self,
        service: &'static str,
        system: &str,
        user: String,
        json_output: bool,
    ) -> Result<Value> {
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": self.temperature,
        });
        if json_output {
            body["response_format"] = json!({ "type": "json_object" });
        }

        self.post_json(service, self.provider.config().api_url, &body)
            .await
    }
}

#[async_trait]
impl SeoAssistant for LlmAssistant {
    async fn grade(&self, metadata: &VideoMetadata) -> Result<AnalysisResult> {
        let response = self
            .chat_completion(GRADING, GRADING_PROMPT, grading_user_prompt(metadata), true)
            .await?;
        let content = extract_chat_content(GRADING, &response)?;
        parse_analysis(&content)
    }

    async fn rewrite_description(&self, request: &RewriteRequest) -> Result<String> {
        let response = self
            .chat_completion(REWRITE, REWRITE_PROMPT, rewrite_user_prompt(request), false)
            .await?;
        let content = extract_chat_content(REWRITE, &response)?;
        Ok(strip_markdown_fences(&content).unwrap_or(content))
    }

    async fn market_intelligence(&self, niche: &str) -> Result<IntelligenceResult> {
        let user = intelligence_user_prompt(niche);

        let (response, text) = match self.provider.config().responses_url {
            Some(url) => {
                let body = json!({
                    "model": self.model,
                    "tools": [{ "type": "web_search" }],
                    "input": [
                        { "role": "system", "content": INTELLIGENCE_PROMPT },
                        { "role": "user", "content": user },
                    ],
                    "temperature": self.temperature,
                });
                let response = self.post_json(INTELLIGENCE, url, &body).await?;
                let text = extract_response_text(&response).ok_or_else(|| {
                    VidgradeError::malformed(INTELLIGENCE, "no message in response output")
                })?;
                (response, text)
            }
            None => {
                let response = self
                    .chat_completion(INTELLIGENCE, INTELLIGENCE_PROMPT, user, false)
                    .await?;
                let text = extract_chat_content(INTELLIGENCE, &response)?;
                (response, text)
            }
        };

        Ok(IntelligenceResult {
            text,
            sources: extract_sources(&response),
        })
    }

    async fn chat(&self, request: ChatRequest) -> Result<TextStream> {
        let mut messages = vec![json!({
            "role": "system",
            "content": format!("{CHAT_PROMPT}\n\n{}", request.context),
        })];
        for turn in &request.history {
            let role = match turn.role {
                ChatRole::User => "user",
                ChatRole::Model => "assistant",
            };
            messages.push(json!({ "role": role, "content": turn.text }));
        }
        messages.push(json!({ "role": "user", "content": request.message }));

        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "stream": true,
        });

        let response = self
            .send(CHAT, self.provider.config().api_url, &body)
            .await?;
        Ok(sse_text_stream(response.bytes_stream()))
    }
}

/// `choices[0].message.content` of a chat-completions response.
pub(crate) fn extract_chat_content(service: &'static str, response: &Value) -> Result<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
        .ok_or_else(|| VidgradeError::malformed(service, "response has no message content"))
}

/// Text of the last `message` item of a responses-endpoint output.
pub(crate) fn extract_response_text(response: &Value) -> Option<String> {
    let message = response["output"]
        .as_array()?
        .iter()
        .rev()
        .find(|item| item["type"] == "message")?;

    let text: String = message["content"]
        .as_array()?
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Citations from `url_citation` annotations or a top-level `citations` list,
/// first occurrence of each uri kept.
pub(crate) fn extract_sources(response: &Value) -> Vec<Source> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();
    let mut push = |uri: &str, title: Option<&str>| {
        let uri = uri.trim();
        if !uri.is_empty() && seen.insert(uri.to_string()) {
            sources.push(Source {
                uri: uri.to_string(),
                title: title
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
            });
        }
    };

    let outputs = response["output"].as_array().into_iter().flatten();
    let parts = outputs.filter_map(|item| item["content"].as_array()).flatten();
    let annotations = parts
        .filter_map(|part| part["annotations"].as_array())
        .flatten();
    for annotation in annotations {
        if annotation["type"] == "url_citation" {
            if let Some(uri) = annotation["url"].as_str() {
                push(uri, annotation["title"].as_str());
            }
        }
    }

    for citation in response["citations"].as_array().into_iter().flatten() {
        match citation {
            Value::String(uri) => push(uri.as_str(), None),
            Value::Object(_) => {
                if let Some(uri) = citation["url"].as_str() {
                    push(uri, citation["title"].as_str());
                }
            }
            _ => {}
        }
    }

    sources
}

/// Parse and validate the grading JSON, tolerating fences and surrounding prose.
pub fn parse_analysis(content: &str) -> Result<AnalysisResult> {
    let mut candidates = vec![content.trim().to_string()];
    if let Some(stripped) = strip_markdown_fences(content) {
        candidates.push(stripped);
    }
    if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
        if start < end {
            candidates.push(content[start..=end].to_string());
        }
    }

    let mut last_err = None;
    for candidate in candidates {
        match serde_json::from_str::<AnalysisResult>(&candidate) {
            Ok(analysis) => return validate_analysis(analysis),
            Err(e) => last_err = Some(e),
        }
    }

    Err(VidgradeError::malformed(
        GRADING,
        last_err.map_or_else(|| "empty response".to_string(), |e| e.to_string()),
    ))
}

fn validate_analysis(analysis: AnalysisResult) -> Result<AnalysisResult> {
    for (field, score) in analysis.scores() {
        if score > 100 {
            return Err(VidgradeError::malformed(
                GRADING,
                format!("{field} is {score}, expected 0-100"),
            ));
        }
    }
    Ok(analysis)
}

fn strip_markdown_fences(content: &str) -> Option<String> {
    let without_open = content.trim().strip_prefix("```")?;
    let body = match without_open.find('\n') {
        Some(newline) => &without_open[newline + 1..],
        None => without_open,
    };
    let end = body.rfind("```")?;
    Some(body[..end].trim().to_string())
}

#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    Delta(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line.trim().strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }

    match serde_json::from_str::<Value>(data) {
        Ok(chunk) => match chunk["choices"][0]["delta"]["content"].as_str() {
            Some(text) if !text.is_empty() => SseLine::Delta(text.to_string()),
            _ => SseLine::Skip,
        },
        Err(e) => {
            debug!(error = %e, "skipping undecodable stream line");
            SseLine::Skip
        }
    }
}

struct SseState {
    bytes: futures::stream::BoxStream<'static, std::result::Result<Vec<u8>, String>>,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    done: bool,
}

impl SseState {
    fn push_line(&mut self, line: &[u8]) {
        if self.done {
            return;
        }
        match parse_sse_line(&String::from_utf8_lossy(line)) {
            SseLine::Delta(text) => self.pending.push_back(text),
            SseLine::Done => self.done = true,
            SseLine::Skip => {}
        }
    }

    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.push_line(&line);
        }
    }
}

/// Decode a server-sent-events body into content deltas, ending at `[DONE]`
/// or at the end of the body.
pub(crate) fn sse_text_stream<B, T, E>(bytes: B) -> TextStream
where
    B: Stream<Item = std::result::Result<T, E>> + Send + 'static,
    T: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = SseState {
        bytes: bytes
            .map(|chunk| chunk.map(|c| c.as_ref().to_vec()).map_err(|e| e.to_string()))
            .boxed(),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(delta) = state.pending.pop_front() {
                return Some((Ok(delta), state));
            }
            if state.done {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(&chunk);
                    state.drain_lines();
                }
                Some(Err(reason)) => {
                    state.done = true;
                    let err = VidgradeError::StreamInterrupted {
                        partial: String::new(),
                        reason,
                    };
                    return Some((Err(err), state));
                }
                None => {
                    let rest = std::mem::take(&mut state.buffer);
                    state.push_line(&rest);
                    state.done = true;
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANALYSIS_JSON: &str = r#"{
        "overallScore": 72,
        "summary": "Solid start",
        "title": { "score": 80, "feedback": ["Clear"], "recommendations": ["Add a number"], "suggestions": ["7 Cat Facts"] },
        "description": {
            "score": 60, "feedback": [], "recommendations": ["Add chapters"], "suggestions": [],
            "structuralSuggestions": ["TIMESTAMPS | Chapters | Add chapters | Template: [0:00 Intro]"]
        },
        "tags": { "score": 70, "feedback": [], "recommendations": [], "suggestions": [], "specificTags": ["cats"] }
    }"#;

    #[test]
    fn parses_plain_and_fenced_analysis() {
        let plain = parse_analysis(ANALYSIS_JSON).unwrap();
        assert_eq!(plain.overall_score, 72);
        assert_eq!(plain.tags.specific_tags, Some(vec!["cats".to_string()]));
        assert_eq!(plain.title.structural_suggestions, None);
        assert!(plain.competitive_audit.is_none());

        let fenced = parse_analysis(&format!("```json\n{ANALYSIS_JSON}\n```")).unwrap();
        assert_eq!(fenced, plain);

        let chatty = parse_analysis(&format!("Here is the report:\n{ANALYSIS_JSON}\nEnjoy!")).unwrap();
        assert_eq!(chatty, plain);
    }

    #[test]
    fn rejects_malformed_analysis() {
        assert!(matches!(
            parse_analysis("not json at all"),
            Err(VidgradeError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_analysis(""),
            Err(VidgradeError::MalformedResponse { .. })
        ));
        assert!(matches!(
            parse_analysis(r#"{"overallScore": 72}"#),
            Err(VidgradeError::MalformedResponse { .. })
        ));

        let out_of_range = ANALYSIS_JSON.replace("\"overallScore\": 72", "\"overallScore\": 140");
        let err = parse_analysis(&out_of_range).unwrap_err();
        assert!(err.to_string().contains("overallScore is 140"));
    }

    #[test]
    fn chat_content_must_be_present() {
        let ok = json!({ "choices": [{ "message": { "content": "  hi  " } }] });
        assert_eq!(extract_chat_content(REWRITE, &ok).unwrap(), "hi");

        let empty = json!({ "choices": [{ "message": { "content": "" } }] });
        assert!(extract_chat_content(REWRITE, &empty).is_err());
        assert!(extract_chat_content(REWRITE, &json!({})).is_err());
    }

    #[test]
    fn response_text_and_sources_from_responses_output() {
        let response = json!({
            "output": [
                { "type": "web_search_call", "status": "completed" },
                {
                    "type": "message",
                    "content": [{
                        "type": "output_text",
                        "text": "Cooking shorts are booming.",
                        "annotations": [
                            { "type": "url_citation", "url": "https://a.example", "title": "A" },
                            { "type": "url_citation", "url": "https://b.example", "title": " " },
                            { "type": "url_citation", "url": "https://a.example", "title": "A again" },
                            { "type": "file_citation", "file_id": "f1" }
                        ]
                    }]
                }
            ]
        });

        assert_eq!(
            extract_response_text(&response).as_deref(),
            Some("Cooking shorts are booming.")
        );
        assert_eq!(
            extract_sources(&response),
            vec![
                Source { uri: "https://a.example".to_string(), title: Some("A".to_string()) },
                Source { uri: "https://b.example".to_string(), title: None },
            ]
        );
    }

    #[test]
    fn sources_from_top_level_citations() {
        let response = json!({ "citations": ["https://x.example", { "url": "https://y.example", "title": "Y" }, 3] });
        let sources = extract_sources(&response);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[1].title.as_deref(), Some("Y"));

        assert!(extract_sources(&json!({ "choices": [] })).is_empty());
        assert_eq!(extract_response_text(&json!({ "output": [] })), None);
    }

    #[test]
    fn sse_line_parsing() {
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"content":"Hi"}}]}"#),
            SseLine::Delta("Hi".to_string())
        );
        assert_eq!(parse_sse_line("data: [DONE]"), SseLine::Done);
        assert_eq!(parse_sse_line(": keep-alive"), SseLine::Skip);
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            SseLine::Skip
        );
    }

    #[tokio::test]
    async fn sse_stream_handles_split_chunks() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Caf\u{e9} \"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"time\"}}]}\n\ndata: [DONE]\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n";
        let bytes = body.as_bytes();
        // split inside the multi-byte character and mid-line
        let split = body.find('\u{e9}').unwrap() + 1;
        let chunks: Vec<std::result::Result<Vec<u8>, String>> = vec![
            Ok(bytes[..split].to_vec()),
            Ok(bytes[split..split + 20].to_vec()),
            Ok(bytes[split + 20..].to_vec()),
        ];

        let deltas: Vec<String> = sse_text_stream(futures::stream::iter(chunks))
            .map(|d| d.unwrap())
            .collect()
            .await;
        assert_eq!(deltas, vec!["Caf\u{e9} ".to_string(), "time".to_string()]);
    }

    #[tokio::test]
    async fn sse_stream_reports_transport_error_after_partial_output() {
        let chunks: Vec<std::result::Result<&'static [u8], String>> = vec![
            Ok(&b"data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n"[..]),
            Err("connection reset".to_string()),
        ];

        let items: Vec<Result<String>> = sse_text_stream(futures::stream::iter(chunks))
            .collect()
            .await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "partial");
        assert!(matches!(
            &items[1],
            Err(VidgradeError::StreamInterrupted { reason, .. }) if reason == "connection reset"
        ));
    }

    #[tokio::test]
    async fn sse_stream_flushes_unterminated_last_line() {
        let chunks: Vec<std::result::Result<&'static [u8], String>> =
            vec![Ok(&b"data: {\"choices\":[{\"delta\":{\"content\":\"end\"}}]}"[..])];
        let deltas: Vec<String> = sse_text_stream(futures::stream::iter(chunks))
            .map(|d| d.unwrap())
            .collect()
            .await;
        assert_eq!(deltas, vec!["end".to_string()]);
    }
}
