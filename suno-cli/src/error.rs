use suno_api::SunoError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid manifest: {0}")]
    Manifest(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("conversion failed: {0}")]
    Convert(String),

    #[error(transparent)]
    Api(#[from] SunoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cancelled by user")]
    Interrupted,
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Interrupted => 130,
            _ => 1,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

/// Human-oriented failure description: timeouts get a "still generating"
/// hint since the remote job may yet complete.
pub fn describe(error: &CliError) -> String {
    match error {
        CliError::Api(api) if api.is_timeout() => {
            format!("{api} - the song may still be generating; retry later with `suno download`")
        }
        other => other.to_string(),
    }
}
