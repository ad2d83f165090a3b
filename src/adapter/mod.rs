//! Backend strategies.
//!
//! Each backend only knows how to build its request and read its own wire
//! format. Sending, status handling, stream decoding and event emission live
//! in [`crate::client`] and are shared by both.

pub mod local;
mod probe;
pub mod remote;
pub mod transport;

pub use local::LocalChatAdapter;
pub use remote::RemoteChatAdapter;
pub use transport::Timeouts;

use crate::error::ChatError;
use crate::protocol::{ConnectionStatus, RequestOptions};
use crate::stream::{StreamChunk, StreamFraming};
use async_trait::async_trait;
use reqwest::RequestBuilder;

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Short label used in logs and status text.
    fn name(&self) -> &'static str;

    fn model(&self) -> &str;

    fn default_options(&self) -> RequestOptions;

    /// Builds a fresh request carrying `message`.
    fn build_request(&self, message: &str, options: &RequestOptions) -> RequestBuilder;

    fn stream_framing(&self) -> StreamFraming;

    /// Reads the reply text out of a complete, non-empty response body.
    fn parse_body(&self, body: &str) -> Result<String, ChatError>;

    /// Reads one streamed frame. An `Err` marks the frame as malformed; the
    /// caller skips it.
    fn parse_frame(&self, payload: &str) -> Result<StreamChunk, ChatError>;

    async fn check_connection(&self) -> ConnectionStatus;

    /// Available models, or an empty list when they cannot be determined.
    async fn list_models(&self) -> Vec<String>;

    /// Displayable description of the configured model. Never fails.
    async fn model_info(&self) -> String;

    /// Quota and billing notes for this backend.
    fn usage_note(&self) -> String;
}
