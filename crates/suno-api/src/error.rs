use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SunoError>;

#[derive(Debug, Error)]
pub enum SunoError {
    /// Bad input combination, rejected before any remote call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The submit response carried no task id, neither top-level nor nested.
    #[error("no taskId in response")]
    MissingTaskId,

    /// The remote reported a terminal FAILED state, with its error message.
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// Terminal success but zero variants in the payload.
    #[error("no result data for task {0}")]
    NoResultData(String),

    #[error("timed out after {waited:?} waiting for task {task_id}")]
    Timeout { task_id: String, waited: Duration },

    /// Content loader failure (URL fetch or file read).
    #[error("failed to load {label}: {reason}")]
    Content { label: String, reason: String },
}

impl SunoError {
    pub fn content(label: impl Into<String>, reason: impl ToString) -> Self {
        Self::Content {
            label: label.into(),
            reason: reason.to_string(),
        }
    }

    /// Timeouts are surfaced differently from other remote failures: the
    /// job may still complete on the remote side.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
