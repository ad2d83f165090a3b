use crate::adapter::ChatBackend;
use crate::adapter::transport::ensure_success;
use crate::error::ChatError;
use crate::handle::{self, ChatStream, EventSink};
use crate::protocol::{ConnectionStatus, RequestOptions};
use crate::stream::{FrameDecoder, ResponseAccumulator};
use futures::StreamExt;
use reqwest::Response;
use std::sync::Arc;
use tracing::{debug, warn};

/// Entry point for sending messages to a backend.
///
/// Every [`send_message`](Self::send_message) runs as its own task with its
/// own accumulator; calls share nothing but the backend's HTTP client.
#[derive(Clone)]
pub struct ChatClient {
    backend: Arc<dyn ChatBackend>,
    options: RequestOptions,
}

impl ChatClient {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        let options = backend.default_options();
        Self { backend, options }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn backend(&self) -> &dyn ChatBackend {
        self.backend.as_ref()
    }

    pub fn options(&self) -> RequestOptions {
        self.options
    }

    /// Sends `message` with the client's default options. Must be called
    /// from within a tokio runtime.
    pub fn send_message(&self, message: impl Into<String>) -> ChatStream {
        self.send_message_with(message, self.options)
    }

    pub fn send_message_with(&self, message: impl Into<String>, options: RequestOptions) -> ChatStream {
        let (sink, stream) = handle::channel();
        let backend = Arc::clone(&self.backend);
        let message = message.into();
        tokio::spawn(async move {
            exchange(backend.as_ref(), &message, options, sink).await;
        });
        stream
    }

    pub async fn check_connection(&self) -> ConnectionStatus {
        self.backend.check_connection().await
    }

    pub async fn list_models(&self) -> Vec<String> {
        self.backend.list_models().await
    }

    pub async fn model_info(&self) -> String {
        self.backend.model_info().await
    }

    pub fn usage_note(&self) -> String {
        self.backend.usage_note()
    }
}

async fn exchange(backend: &dyn ChatBackend, message: &str, options: RequestOptions, mut sink: EventSink) {
    debug!(
        backend = backend.name(),
        model = backend.model(),
        streaming = options.use_streaming,
        shape = ?options.api_shape,
        "sending message"
    );

    let result = run_exchange(backend, message, &options, &mut sink).await;
    match &result {
        Ok(text) => debug!(backend = backend.name(), chars = text.len(), "reply complete"),
        Err(err) => warn!(backend = backend.name(), error = %err, "reply failed"),
    }
    sink.settle(result).await;
}

async fn run_exchange(
    backend: &dyn ChatBackend,
    message: &str,
    options: &RequestOptions,
    sink: &mut EventSink,
) -> Result<String, ChatError> {
    let response = backend.build_request(message, options).send().await?;
    let response = ensure_success(response).await?;

    if options.use_streaming {
        consume_stream(backend, response, sink).await
    } else {
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(ChatError::empty("empty response"));
        }
        backend.parse_body(&body)
    }
}

/// Reads the body frame by frame. The response is owned here, so every return
/// path drops it and releases the connection.
async fn consume_stream(
    backend: &dyn ChatBackend,
    response: Response,
    sink: &mut EventSink,
) -> Result<String, ChatError> {
    let mut decoder = FrameDecoder::new(backend.stream_framing());
    let mut accumulator = ResponseAccumulator::new();
    let mut bytes = response.bytes_stream();

    while let Some(chunk) = bytes.next().await {
        let chunk = chunk
            .map_err(|e| ChatError::network(format!("stream interrupted: {}", e.without_url())))?;
        for frame in decoder.push(&chunk) {
            if apply_frame(backend, &frame, &mut accumulator, sink).await? {
                return Ok(accumulator.into_text());
            }
        }
    }

    if let Some(frame) = decoder.finish() {
        if apply_frame(backend, &frame, &mut accumulator, sink).await? {
            return Ok(accumulator.into_text());
        }
    }

    // No done marker: end of body counts as completion.
    if accumulator.is_empty() {
        Err(ChatError::empty("empty response"))
    } else {
        debug!(backend = backend.name(), "stream ended without done marker");
        Ok(accumulator.into_text())
    }
}

/// Applies one frame. Returns true when consumption should stop.
async fn apply_frame(
    backend: &dyn ChatBackend,
    frame: &str,
    accumulator: &mut ResponseAccumulator,
    sink: &mut EventSink,
) -> Result<bool, ChatError> {
    if frame.trim().is_empty() {
        return Ok(false);
    }

    let chunk = match backend.parse_frame(frame) {
        Ok(chunk) => chunk,
        Err(err) => {
            debug!(backend = backend.name(), error = %err, "skipping malformed stream frame");
            return Ok(false);
        }
    };

    if let Some(message) = chunk.error {
        return Err(ChatError::Backend(message));
    }

    if let Some(text) = chunk.text.as_deref() {
        if accumulator.append(text) && !sink.partial(accumulator.snapshot()).await {
            debug!(backend = backend.name(), "reply abandoned by consumer");
            return Ok(true);
        }
    }

    if chunk.done {
        accumulator.mark_done();
        if let Some(reason) = chunk.empty_reason.filter(|_| accumulator.is_empty()) {
            return Err(ChatError::empty(reason));
        }
        return Ok(true);
    }
    Ok(false)
}
