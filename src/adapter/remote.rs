use super::probe::{fetch_optional, probe};
use super::transport::{Timeouts, http_client};
use super::ChatBackend;
use crate::ai_sdk::gemini::{
    self, GenerateContentRequest, GenerationConfig, SafetySetting, default_safety_settings,
};
use crate::error::ChatError;
use crate::protocol::{ConnectionStatus, RequestOptions};
use crate::stream::{StreamChunk, StreamFraming};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const FREE_TIER_NOTE: &str = "Gemini API free tier limits:
  1,500 requests per day
  15 requests per minute
  1 million tokens per minute

Upgrade to a paid plan for higher limits.";

/// Hosted Gemini `generateContent` backend.
///
/// Non-streaming by default. With streaming enabled the request goes to
/// `streamGenerateContent?alt=sse` and every event carries the next slice of
/// text.
pub struct RemoteChatAdapter {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
    generation: GenerationConfig,
    safety: Vec<SafetySetting>,
}

impl RemoteChatAdapter {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            http: http_client(&timeouts),
            base_url: normalize_base_url(&base_url.into()),
            model: model.into(),
            api_key: api_key.into(),
            generation: GenerationConfig::default(),
            safety: default_safety_settings(),
        }
    }

    pub fn with_generation_config(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_safety_settings(mut self, safety: Vec<SafetySetting>) -> Self {
        self.safety = safety;
        self
    }

    pub fn generation_config(&self) -> &GenerationConfig {
        &self.generation
    }

    fn generate_request(&self, text: &str, streaming: bool, generation: GenerationConfig) -> RequestBuilder {
        let body = GenerateContentRequest::user_text(text, generation, self.safety.clone());
        let url = if streaming {
            self.endpoint(
                &format!("/{}:streamGenerateContent", self.model),
                &[("alt", "sse")],
            )
        } else {
            self.endpoint(&format!("/{}:generateContent", self.model), &[])
        };
        self.http.post(url).json(&body)
    }

    /// `{base}{suffix}` with the API key and `params` in the query string.
    fn endpoint(&self, suffix: &str, params: &[(&str, &str)]) -> String {
        let raw = format!("{}{}", self.base_url, suffix);
        let query = params
            .iter()
            .copied()
            .chain([("key", self.api_key.as_str())]);
        match Url::parse_with_params(&raw, query) {
            Ok(url) => url.to_string(),
            Err(_) => raw,
        }
    }
}

#[async_trait]
impl ChatBackend for RemoteChatAdapter {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn default_options(&self) -> RequestOptions {
        RequestOptions::single_shot()
    }

    fn build_request(&self, message: &str, options: &RequestOptions) -> RequestBuilder {
        self.generate_request(message, options.use_streaming, self.generation.clone())
    }

    fn stream_framing(&self) -> StreamFraming {
        StreamFraming::ServerSentEvents
    }

    fn parse_body(&self, body: &str) -> Result<String, ChatError> {
        gemini::extract_text(body)
    }

    fn parse_frame(&self, payload: &str) -> Result<StreamChunk, ChatError> {
        gemini::parse_stream_frame(payload)
    }

    async fn check_connection(&self) -> ConnectionStatus {
        let generation = GenerationConfig {
            max_output_tokens: 1,
            ..self.generation.clone()
        };
        match probe(self.generate_request("Hi", false, generation), self.name()).await {
            Ok(_) => ConnectionStatus::connected(format!("Connected to Gemini ({})", self.model)),
            Err(status) => status,
        }
    }

    async fn list_models(&self) -> Vec<String> {
        let request = self.http.get(self.endpoint("", &[]));
        fetch_optional(request, "model list")
            .await
            .and_then(|body| gemini::model_names(&body).ok())
            .unwrap_or_default()
    }

    async fn model_info(&self) -> String {
        let request = self
            .http
            .get(self.endpoint(&format!("/{}", self.model), &[]));
        let body = fetch_optional(request, "model info").await.unwrap_or_default();
        gemini::describe_model(&body, &self.model)
    }

    fn usage_note(&self) -> String {
        FREE_TIER_NOTE.to_string()
    }
}

fn normalize_base_url(value: &str) -> String {
    value.trim_end_matches('/').to_string()
}
