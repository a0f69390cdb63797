//! Errors surfaced by the client layer.

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status and a `{message}` body.
    #[error("{message} (status {status})")]
    Api { status: u16, message: String },

    /// A 401 that could not be recovered from; the session has been cleared.
    #[error("Session expired, please sign in again")]
    SessionExpired,

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        match self {
            ClientError::Api { status, .. } => *status == StatusCode::UNAUTHORIZED.as_u16(),
            ClientError::Http(e) => e.status() == Some(StatusCode::UNAUTHORIZED),
            _ => false,
        }
    }
}
