use crate::error::ChatError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Request body layout for the local backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ApiShape {
    /// `{model, prompt, stream}` against `/api/generate`.
    Completion,
    /// `{model, messages, stream}` against `/api/chat`.
    #[default]
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    pub use_streaming: bool,
    pub api_shape: ApiShape,
}

impl RequestOptions {
    pub fn streaming() -> Self {
        Self {
            use_streaming: true,
            api_shape: ApiShape::Chat,
        }
    }

    pub fn single_shot() -> Self {
        Self {
            use_streaming: false,
            api_shape: ApiShape::Chat,
        }
    }

    pub fn with_streaming(mut self, use_streaming: bool) -> Self {
        self.use_streaming = use_streaming;
        self
    }

    pub fn with_api_shape(mut self, api_shape: ApiShape) -> Self {
        self.api_shape = api_shape;
        self
    }
}

/// One step of a reply.
///
/// `Partial` always carries the full text received so far, never just the
/// newest fragment. `Response` and `Error` are terminal: exactly one of them
/// ends a call, and nothing follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Partial(String),
    Response(String),
    Error(ChatError),
}

impl ChatEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChatEvent::Partial(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub message: String,
}

impl ConnectionStatus {
    pub fn connected(message: impl Into<String>) -> Self {
        Self {
            connected: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            connected: false,
            message: message.into(),
        }
    }
}
