use super::probe::{fetch_optional, probe};
use super::transport::{Timeouts, http_client};
use super::ChatBackend;
use crate::ai_sdk::ollama::{self, ChatRequest, GenerateRequest, VersionResponse};
use crate::error::ChatError;
use crate::protocol::{ApiShape, ConnectionStatus, RequestOptions};
use crate::stream::{StreamChunk, StreamFraming};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "phi";

/// Locally reachable Ollama server. Streams by default, one JSON object per
/// line.
pub struct LocalChatAdapter {
    http: Client,
    base_url: String,
    model: String,
}

impl LocalChatAdapter {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeouts: Timeouts) -> Self {
        Self {
            http: http_client(&timeouts),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn tags(&self) -> Option<Vec<ollama::TagModel>> {
        let body = fetch_optional(self.http.get(self.url("/api/tags")), "model list").await?;
        match ollama::parse_tags(&body) {
            Ok(models) => Some(models),
            Err(err) => {
                warn!(error = %err, "unreadable model list");
                None
            }
        }
    }
}

#[async_trait]
impl ChatBackend for LocalChatAdapter {
    fn name(&self) -> &'static str {
        "Ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn default_options(&self) -> RequestOptions {
        RequestOptions::streaming()
    }

    fn build_request(&self, message: &str, options: &RequestOptions) -> RequestBuilder {
        match options.api_shape {
            ApiShape::Completion => self.http.post(self.url("/api/generate")).json(&GenerateRequest {
                model: &self.model,
                prompt: message,
                stream: options.use_streaming,
            }),
            ApiShape::Chat => self.http.post(self.url("/api/chat")).json(&ChatRequest::user(
                &self.model,
                message,
                options.use_streaming,
            )),
        }
    }

    fn stream_framing(&self) -> StreamFraming {
        StreamFraming::JsonLines
    }

    fn parse_body(&self, body: &str) -> Result<String, ChatError> {
        ollama::parse_body(body)
    }

    fn parse_frame(&self, payload: &str) -> Result<StreamChunk, ChatError> {
        ollama::parse_line(payload)
    }

    async fn check_connection(&self) -> ConnectionStatus {
        match probe(self.http.get(self.url("/api/version")), self.name()).await {
            Ok(body) => {
                let version = serde_json::from_str::<VersionResponse>(&body)
                    .ok()
                    .and_then(|v| v.version);
                match version {
                    Some(version) => ConnectionStatus::connected(format!("Connected to Ollama {version}")),
                    None => ConnectionStatus::connected("Connected to Ollama"),
                }
            }
            Err(status) => status,
        }
    }

    async fn list_models(&self) -> Vec<String> {
        self.tags()
            .await
            .map(|models| models.into_iter().map(|model| model.name).collect())
            .unwrap_or_default()
    }

    async fn model_info(&self) -> String {
        let models = self.tags().await.unwrap_or_default();
        format!("{}\nServer: {}", ollama::describe_model(&models, &self.model), self.base_url)
    }

    fn usage_note(&self) -> String {
        format!("Ollama runs on {}; requests are not metered.", self.base_url)
    }
}
