use super::transport::ensure_success;
use crate::error::ChatError;
use crate::protocol::ConnectionStatus;
use reqwest::RequestBuilder;
use tracing::{debug, warn};

/// Sends a health request. Returns the body on success, or a failed status
/// whose message tells a network failure apart from an HTTP one.
pub(crate) async fn probe(request: RequestBuilder, service: &str) -> Result<String, ConnectionStatus> {
    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => {
            warn!(service, error = %err, "connection probe failed");
            return Err(ConnectionStatus::failed(format!(
                "Cannot connect to {service}: {}",
                ChatError::from(err)
            )));
        }
    };

    match ensure_success(response).await {
        Ok(response) => Ok(response.text().await.unwrap_or_default()),
        Err(err) => {
            warn!(service, error = %err, "connection probe rejected");
            Err(ConnectionStatus::failed(format!("{service} server error: {err}")))
        }
    }
}

/// GETs a resource and returns its body; any failure is logged and reported
/// as `None` so metadata calls never fail their caller.
pub(crate) async fn fetch_optional(request: RequestBuilder, what: &str) -> Option<String> {
    let result = async {
        let response = request.send().await?;
        let response = ensure_success(response).await?;
        Ok::<_, ChatError>(response.text().await?)
    }
    .await;

    match result {
        Ok(body) => Some(body),
        Err(err) => {
            debug!(what, error = %err, "metadata request failed");
            None
        }
    }
}
