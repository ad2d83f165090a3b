use crate::ai_sdk;
use crate::error::ChatError;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::warn;

const BODY_EXCERPT_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    /// Applies to each read of the response body, so long streams stay alive
    /// as long as the backend keeps producing.
    pub read: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            read: Duration::from_secs(60),
        }
    }
}

/// Falls back to a client without timeouts if the configured one cannot be
/// built.
pub(crate) fn http_client(timeouts: &Timeouts) -> Client {
    let built = Client::builder()
        .connect_timeout(timeouts.connect)
        .read_timeout(timeouts.read)
        .build();
    match built {
        Ok(client) => client,
        Err(err) => {
            warn!(
                error = %err,
                connect = ?timeouts.connect,
                read = ?timeouts.read,
                "http client setup failed, continuing without timeouts"
            );
            Client::new()
        }
    }
}

/// Passes successful responses through and turns everything else into
/// [`ChatError::Http`].
pub(crate) async fn ensure_success(response: Response) -> Result<Response, ChatError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(http_error(status, &body))
}

pub(crate) fn http_error(status: StatusCode, body: &str) -> ChatError {
    let message = ai_sdk::error_message(body).unwrap_or_else(|| {
        let excerpt = excerpt(body);
        if excerpt.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("no response body")
                .to_string()
        } else {
            excerpt
        }
    });
    ChatError::Http {
        status: status.as_u16(),
        message,
    }
}

fn excerpt(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() > BODY_EXCERPT_CHARS {
        let cut: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
        format!("{cut}...")
    } else {
        body.to_string()
    }
}
