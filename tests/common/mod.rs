#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use chatai::{ChatEvent, Timeouts};
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// Requests seen by a mock server, as `(path_and_query, body)`.
pub type Recorded = Arc<Mutex<Vec<(String, String)>>>;

/// Starts a server on an ephemeral port that answers every request with
/// `responder(path_and_query, body)`.
pub async fn mock_server<F>(responder: F) -> (String, Recorded)
where
    F: Fn(&str, &str) -> Response + Send + Sync + 'static,
{
    let seen: Recorded = Arc::new(Mutex::new(Vec::new()));
    let responder = Arc::new(responder);
    let recorder = Arc::clone(&seen);

    let app = Router::new().fallback(move |uri: Uri, body: String| {
        let responder = Arc::clone(&responder);
        let recorder = Arc::clone(&recorder);
        async move {
            let path = uri
                .path_and_query()
                .map(|p| p.as_str().to_string())
                .unwrap_or_default();
            let response = responder(&path, &body);
            recorder.lock().unwrap().push((path, body));
            response
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), seen)
}

/// Base URL of a port nothing listens on.
pub async fn unreachable_base() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn json(status: StatusCode, body: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

/// Streams `chunks` with a short pause before each, so they reach the client
/// as separate reads.
pub fn chunked(chunks: &[&str]) -> Response {
    let chunks: Vec<String> = chunks.iter().map(|c| c.to_string()).collect();
    let stream = futures::stream::iter(chunks).then(|chunk| async move {
        tokio::time::sleep(Duration::from_millis(2)).await;
        Ok::<_, Infallible>(chunk)
    });
    Response::new(Body::from_stream(stream))
}

pub fn test_timeouts() -> Timeouts {
    Timeouts {
        connect: Duration::from_secs(2),
        read: Duration::from_secs(5),
    }
}

/// Checks the event-order contract and returns the terminal event.
pub fn assert_single_terminal(events: &[ChatEvent]) -> &ChatEvent {
    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminals, 1, "expected exactly one terminal event: {:?}", events);
    let last = events.last().unwrap();
    assert!(last.is_terminal(), "terminal event must be last: {:?}", events);
    last
}

/// Partial texts must grow as prefixes of each other.
pub fn assert_cumulative(events: &[ChatEvent]) {
    let mut previous = String::new();
    for event in events {
        if let ChatEvent::Partial(text) = event {
            assert!(
                text.starts_with(&previous) && text.len() >= previous.len(),
                "partial {:?} does not extend {:?}",
                text,
                previous
            );
            previous = text.clone();
        }
    }
}
