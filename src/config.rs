use crate::adapter::{self, ChatBackend, LocalChatAdapter, RemoteChatAdapter, Timeouts};
use crate::ai_sdk::gemini::GenerationConfig;
use crate::protocol::{ApiShape, RequestOptions};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Hosted Gemini API.
    Remote,
    /// Ollama server on the local network.
    Local,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set; pass --api-key or add it to .env")]
    MissingApiKey,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "chatai")]
#[command(author, version, about = "Chat with Gemini or a local Ollama server", long_about = None)]
pub struct Config {
    #[arg(long, env = "CHATAI_BACKEND", value_enum, default_value_t = BackendKind::Local, global = true)]
    pub backend: BackendKind,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = adapter::remote::DEFAULT_MODEL, global = true)]
    pub gemini_model: String,

    #[arg(long, env = "GEMINI_BASE_URL", default_value = adapter::remote::DEFAULT_BASE_URL, global = true)]
    pub gemini_base_url: String,

    #[arg(long, env = "OLLAMA_URL", default_value = adapter::local::DEFAULT_BASE_URL, global = true)]
    pub ollama_url: String,

    #[arg(long, env = "OLLAMA_MODEL", default_value = adapter::local::DEFAULT_MODEL, global = true)]
    pub ollama_model: String,

    /// Request layout for the local backend.
    #[arg(long, env = "CHATAI_API_SHAPE", value_enum, default_value_t = ApiShape::Chat, global = true)]
    pub api_shape: ApiShape,

    /// Override the backend's streaming default.
    #[arg(long, env = "CHATAI_STREAM", global = true)]
    pub stream: Option<bool>,

    #[arg(long, default_value_t = 30, global = true)]
    pub connect_timeout_secs: u64,

    #[arg(long, default_value_t = 60, global = true)]
    pub read_timeout_secs: u64,

    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    #[arg(long, global = true)]
    pub top_k: Option<u32>,

    #[arg(long, global = true)]
    pub top_p: Option<f32>,

    #[arg(long, global = true)]
    pub max_output_tokens: Option<u32>,

    /// Directory for the log file. Defaults to the system temp directory.
    #[arg(long, env = "CHATAI_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Interactive chat (default).
    Chat,
    /// Send one message and print the reply.
    Ask { message: String },
    /// List the backend's models.
    Models,
    /// Check that the backend is reachable.
    Check,
    /// Describe the configured model.
    Info,
    /// Show the backend's quota notes.
    Usage,
}

impl Config {
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            read: Duration::from_secs(self.read_timeout_secs),
        }
    }

    pub fn generation_config(&self) -> GenerationConfig {
        let defaults = GenerationConfig::default();
        GenerationConfig {
            temperature: self.temperature.unwrap_or(defaults.temperature),
            top_k: self.top_k.unwrap_or(defaults.top_k),
            top_p: self.top_p.unwrap_or(defaults.top_p),
            max_output_tokens: self.max_output_tokens.unwrap_or(defaults.max_output_tokens),
            stop_sequences: defaults.stop_sequences,
        }
    }

    pub fn build_backend(&self) -> Result<Arc<dyn ChatBackend>, ConfigError> {
        match self.backend {
            BackendKind::Remote => {
                let api_key = self
                    .api_key
                    .as_deref()
                    .filter(|key| !key.trim().is_empty())
                    .ok_or(ConfigError::MissingApiKey)?;
                let adapter = RemoteChatAdapter::new(
                    api_key,
                    &self.gemini_model,
                    &self.gemini_base_url,
                    self.timeouts(),
                )
                .with_generation_config(self.generation_config());
                Ok(Arc::new(adapter))
            }
            BackendKind::Local => Ok(Arc::new(LocalChatAdapter::new(
                &self.ollama_url,
                &self.ollama_model,
                self.timeouts(),
            ))),
        }
    }

    /// The backend's defaults with any overrides from the command line.
    pub fn request_options(&self, backend: &dyn ChatBackend) -> RequestOptions {
        let defaults = backend.default_options();
        defaults
            .with_streaming(self.stream.unwrap_or(defaults.use_streaming))
            .with_api_shape(self.api_shape)
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }
}
