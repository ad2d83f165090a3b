//! Chat client for a hosted Gemini model or a local Ollama server.
//!
//! Both backends are driven through one [`ChatClient`]; replies arrive as a
//! [`ChatStream`] of cumulative partial updates followed by exactly one
//! terminal event.

pub mod adapter;
pub mod ai_sdk;
pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod handle;
pub mod protocol;
pub mod stream;
pub mod ui;

pub use adapter::{ChatBackend, LocalChatAdapter, RemoteChatAdapter, Timeouts};
pub use client::ChatClient;
pub use conversation::{ChatMessage, Conversation, Origin};
pub use error::ChatError;
pub use handle::{ChatCallback, ChatStream};
pub use protocol::{ApiShape, ChatEvent, ConnectionStatus, RequestOptions};
