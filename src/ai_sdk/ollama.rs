use crate::error::ChatError;
use crate::stream::StreamChunk;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequest<'a> {
    pub(crate) model: &'a str,
    pub(crate) prompt: &'a str,
    pub(crate) stream: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub(crate) model: &'a str,
    pub(crate) messages: Vec<ChatTurn<'a>>,
    pub(crate) stream: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatTurn<'a> {
    pub(crate) role: &'a str,
    pub(crate) content: &'a str,
}

impl<'a> ChatRequest<'a> {
    pub(crate) fn user(model: &'a str, content: &'a str, stream: bool) -> Self {
        Self {
            model,
            messages: vec![ChatTurn {
                role: "user",
                content,
            }],
            stream,
        }
    }
}

/// One body (non-streaming) or one line (streaming) from `/api/generate` or
/// `/api/chat`. Completion replies put text in `response`, chat replies in
/// `message.content`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResponseLine {
    #[serde(default)]
    pub(crate) response: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<ReplyMessage>,
    #[serde(default)]
    pub(crate) done: bool,
    #[serde(default)]
    pub(crate) error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReplyMessage {
    #[serde(default)]
    pub(crate) content: Option<String>,
}

impl ResponseLine {
    fn fragment(&self) -> Option<&str> {
        self.response.as_deref().or_else(|| {
            self.message
                .as_ref()
                .and_then(|message| message.content.as_deref())
        })
    }
}

pub(crate) fn parse_line(line: &str) -> Result<StreamChunk, ChatError> {
    let line: ResponseLine = serde_json::from_str(line)?;
    Ok(StreamChunk {
        text: line.fragment().map(str::to_string),
        done: line.done,
        error: line.error.filter(|message| !message.is_empty()),
        empty_reason: None,
    })
}

pub(crate) fn parse_body(body: &str) -> Result<String, ChatError> {
    let line: ResponseLine = serde_json::from_str(body)?;
    if let Some(message) = line.error.as_deref().filter(|m| !m.is_empty()) {
        return Err(ChatError::Backend(message.to_string()));
    }
    match line.fragment() {
        None => Err(ChatError::mismatch("missing response field")),
        Some("") => Err(ChatError::empty("empty response from AI")),
        Some(text) => Ok(text.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionResponse {
    #[serde(default)]
    pub(crate) version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagsResponse {
    pub(crate) models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagModel {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) details: Option<TagDetails>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagDetails {
    #[serde(default)]
    pub(crate) family: Option<String>,
    #[serde(default)]
    pub(crate) parameter_size: Option<String>,
    #[serde(default)]
    pub(crate) quantization_level: Option<String>,
}

pub(crate) fn parse_tags(body: &str) -> Result<Vec<TagModel>, ChatError> {
    let tags: TagsResponse = serde_json::from_str(body)?;
    Ok(tags.models)
}

/// Summary of `model` from a tags listing; just the name when it is not listed.
pub(crate) fn describe_model(models: &[TagModel], model: &str) -> String {
    let Some(entry) = models
        .iter()
        .find(|entry| entry.name == model || entry.name == format!("{model}:latest"))
    else {
        return format!("Model: {model}");
    };

    let mut details = Vec::new();
    if let Some(info) = &entry.details {
        if let Some(family) = &info.family {
            details.push(format!("family {family}"));
        }
        if let Some(size) = &info.parameter_size {
            details.push(format!("{size} parameters"));
        }
        if let Some(quantization) = &info.quantization_level {
            details.push(quantization.clone());
        }
    }

    if details.is_empty() {
        format!("Model: {}", entry.name)
    } else {
        format!("Model: {} ({})", entry.name, details.join(", "))
    }
}
