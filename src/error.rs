//! Error types shared by the mailbox, calendar, credential and model clients.

use reqwest::{Response, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Underlying HTTP client error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// No usable credentials; the user has to sign in again.
    #[error("not signed in or session expired; run `mailpilot login`")]
    ReauthRequired,
    /// The requested calendar slot overlaps an existing event.
    #[error("calendar busy: overlaps with '{0}'")]
    MeetingConflict(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The model answered without any candidate text.
    #[error("model returned an empty response")]
    EmptyModelResponse,
    #[error("config error: {0}")]
    Config(String),
    /// HTTP response returned a non-success status with body.
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Pass successful responses through; map 401 to [`Error::ReauthRequired`]
/// and anything else non-2xx to [`Error::Status`].
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::ReauthRequired);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Status { status, body })
}
