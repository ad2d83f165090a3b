use crate::error::ChatError;
use crate::stream::StreamChunk;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub(crate) contents: Vec<Content>,
    pub(crate) generation_config: GenerationConfig,
    pub(crate) safety_settings: Vec<SafetySetting>,
}

impl GenerateContentRequest {
    pub(crate) fn user_text(
        text: &str,
        generation_config: GenerationConfig,
        safety_settings: Vec<SafetySetting>,
    ) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(text.to_string()),
                }],
            }],
            generation_config,
            safety_settings,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) role: Option<String>,
    #[serde(default)]
    pub(crate) parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) text: Option<String>,
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub stop_sequences: Vec<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.9,
            top_k: 1,
            top_p: 1.0,
            max_output_tokens: 2048,
            stop_sequences: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

/// Filter the backend applies on our behalf. Nothing is enforced locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

pub fn default_safety_settings() -> Vec<SafetySetting> {
    [
        HarmCategory::Harassment,
        HarmCategory::HateSpeech,
        HarmCategory::SexuallyExplicit,
        HarmCategory::DangerousContent,
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category,
        threshold: HarmBlockThreshold::BlockMediumAndAbove,
    })
    .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub(crate) candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    pub(crate) prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Candidate {
    #[serde(default)]
    pub(crate) content: Option<CandidateContent>,
    #[serde(default)]
    pub(crate) finish_reason: Option<String>,
}

/// Some API versions return `content` as an object, others as a one-element
/// array wrapping that object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CandidateContent {
    Single(Content),
    Many(Vec<Content>),
}

impl CandidateContent {
    fn parts(&self) -> &[Part] {
        match self {
            CandidateContent::Single(content) => &content.parts,
            CandidateContent::Many(contents) => contents
                .first()
                .map(|content| content.parts.as_slice())
                .unwrap_or(&[]),
        }
    }
}

impl Candidate {
    fn parts(&self) -> &[Part] {
        self.content
            .as_ref()
            .map(CandidateContent::parts)
            .unwrap_or(&[])
    }

    fn first_text(&self) -> Option<&str> {
        self.parts().first().and_then(|part| part.text.as_deref())
    }

    /// Why this candidate produced no usable text.
    fn empty_reason(&self) -> String {
        if !self.parts().is_empty() {
            return "no response text".to_string();
        }
        match &self.finish_reason {
            Some(reason) => format!("no parts in response (finish reason: {reason})"),
            None => "no parts in response".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PromptFeedback {
    #[serde(default)]
    pub(crate) block_reason: Option<String>,
}

/// Extracts the reply text from a complete `generateContent` body.
pub(crate) fn extract_text(body: &str) -> Result<String, ChatError> {
    let response: GenerateContentResponse = serde_json::from_str(body)?;

    let Some(candidates) = response.candidates else {
        if let Some(reason) = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
        {
            return Err(ChatError::empty(format!("prompt blocked: {reason}")));
        }
        return Err(ChatError::mismatch("missing candidates"));
    };

    let candidate = candidates
        .first()
        .ok_or_else(|| ChatError::empty("no candidates"))?;

    match candidate.first_text() {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ChatError::empty(candidate.empty_reason())),
    }
}

#[derive(Debug, Deserialize)]
struct StreamFrame {
    #[serde(flatten)]
    response: GenerateContentResponse,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Interprets one `streamGenerateContent` SSE payload. Each payload carries a
/// delta; a `finishReason` or a blocked prompt marks the last one. Terminal
/// frames carry the reason a reply with no text is empty, matching
/// [`extract_text`].
pub(crate) fn parse_stream_frame(payload: &str) -> Result<StreamChunk, ChatError> {
    let frame: StreamFrame = serde_json::from_str(payload)?;

    if frame.error.is_some() {
        let message = super::error_message(payload).unwrap_or_else(|| payload.to_string());
        return Ok(StreamChunk {
            error: Some(message),
            ..StreamChunk::default()
        });
    }

    let response = frame.response;
    let candidate = response
        .candidates
        .as_ref()
        .and_then(|candidates| candidates.first());

    let Some(candidate) = candidate else {
        let blocked = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason);
        return Ok(match blocked {
            Some(reason) => StreamChunk::default()
                .finished(true)
                .empty_reason(format!("prompt blocked: {reason}")),
            // Metadata-only frame.
            None => StreamChunk::default(),
        });
    };

    let chunk = StreamChunk {
        text: candidate.first_text().map(str::to_string),
        ..StreamChunk::default()
    };
    if candidate.finish_reason.is_some() {
        Ok(chunk.finished(true).empty_reason(candidate.empty_reason()))
    } else {
        Ok(chunk)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ModelResource {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) display_name: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelList {
    #[serde(default)]
    pub(crate) models: Vec<ModelResource>,
}

/// Human-readable model summary. Falls back to `model` for anything missing.
pub(crate) fn describe_model(body: &str, model: &str) -> String {
    let resource = serde_json::from_str::<ModelResource>(body).ok();
    let display_name = resource
        .as_ref()
        .and_then(|r| r.display_name.as_deref())
        .filter(|name| !name.is_empty())
        .unwrap_or(model);
    let description = resource
        .as_ref()
        .and_then(|r| r.description.as_deref())
        .filter(|text| !text.is_empty())
        .unwrap_or("No description available");

    format!("Model: {display_name}\nID: {model}\n\n{description}")
}

pub(crate) fn model_names(body: &str) -> Result<Vec<String>, ChatError> {
    let list: ModelList = serde_json::from_str(body)?;
    Ok(list
        .models
        .into_iter()
        .filter_map(|model| model.name)
        .map(|name| name.trim_start_matches("models/").to_string())
        .collect())
}
