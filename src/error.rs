use thiserror::Error;

/// Failure of a single chat exchange.
///
/// Every variant is surfaced to the caller as [`crate::protocol::ChatEvent::Error`];
/// none of them outlive the call that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// The request never produced a response (connect failure, timeout, reset).
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    /// Well-formed response that carried no usable text.
    #[error("Empty result: {0}")]
    EmptyResult(String),

    /// Response JSON is valid but lacks the envelope fields we need.
    #[error("Unexpected response: {0}")]
    ProtocolMismatch(String),

    /// An error reported by the backend inside an otherwise successful stream.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl ChatError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn empty(msg: impl Into<String>) -> Self {
        Self::EmptyResult(msg.into())
    }

    pub fn mismatch(msg: impl Into<String>) -> Self {
        Self::ProtocolMismatch(msg.into())
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The request URL is dropped from the message: it can carry the API key.
impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            Self::Network(format!("request timed out: {err}"))
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
