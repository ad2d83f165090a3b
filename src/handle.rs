use crate::error::ChatError;
use crate::protocol::ChatEvent;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const EVENT_BUFFER: usize = 64;

/// Observer for a single reply, for callers that prefer callbacks to polling
/// the stream.
pub trait ChatCallback {
    fn on_partial_response(&mut self, text: &str);
    fn on_response(&mut self, text: &str);
    fn on_error(&mut self, error: &ChatError);
}

pub(crate) fn channel() -> (EventSink, ChatStream) {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    (
        EventSink { tx },
        ChatStream {
            inner: ReceiverStream::new(rx),
        },
    )
}

/// Producer half of a reply. The terminal methods take `self`, so a call can
/// emit at most one terminal event and nothing after it.
pub(crate) struct EventSink {
    tx: mpsc::Sender<ChatEvent>,
}

impl EventSink {
    /// Returns false once the consumer has gone away.
    pub(crate) async fn partial(&mut self, text: String) -> bool {
        self.tx.send(ChatEvent::Partial(text)).await.is_ok()
    }

    pub(crate) async fn settle(self, result: Result<String, ChatError>) {
        let event = match result {
            Ok(text) => ChatEvent::Response(text),
            Err(err) => ChatEvent::Error(err),
        };
        let _ = self.tx.send(event).await;
    }
}

/// Consumer half of a reply: a stream of [`ChatEvent`]s ending with exactly
/// one terminal event.
///
/// Dropping the handle abandons the reply; the request task stops at its next
/// event.
pub struct ChatStream {
    inner: ReceiverStream<ChatEvent>,
}

impl ChatStream {
    /// Drains the stream and returns the terminal outcome.
    pub async fn final_text(mut self) -> Result<String, ChatError> {
        while let Some(event) = self.next().await {
            match event {
                ChatEvent::Partial(_) => {}
                ChatEvent::Response(text) => return Ok(text),
                ChatEvent::Error(err) => return Err(err),
            }
        }
        Err(ChatError::network("reply ended without a result"))
    }

    /// Pushes every event into `callback`, in order.
    pub async fn deliver<C: ChatCallback + ?Sized>(mut self, callback: &mut C) {
        while let Some(event) = self.next().await {
            match &event {
                ChatEvent::Partial(text) => callback.on_partial_response(text),
                ChatEvent::Response(text) => callback.on_response(text),
                ChatEvent::Error(err) => callback.on_error(err),
            }
            if event.is_terminal() {
                break;
            }
        }
    }
}

impl Stream for ChatStream {
    type Item = ChatEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
