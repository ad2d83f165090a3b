pub mod gemini;
pub mod ollama;

use serde::Deserialize;

/// Error body shape shared by both backends: Gemini nests an object with a
/// `message`, Ollama sends a bare string.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub(crate) error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorDetail {
    Text(String),
    Object {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        status: Option<String>,
    },
}

impl ErrorEnvelope {
    pub(crate) fn message(&self) -> Option<String> {
        match &self.error {
            ErrorDetail::Text(text) if !text.is_empty() => Some(text.clone()),
            ErrorDetail::Object {
                message: Some(message),
                ..
            } if !message.is_empty() => Some(message.clone()),
            ErrorDetail::Object {
                status: Some(status),
                ..
            } => Some(status.clone()),
            _ => None,
        }
    }
}

pub(crate) fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.message())
}
