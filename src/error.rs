use thiserror::Error;

use crate::transition::TransitionError;

#[derive(Error, Debug)]
pub enum Error {
    /// The request could not be sent or its response could not be read.
    #[error("Network error: {0}")]
    Network(String),

    /// The directory answered with a non-success status.
    #[error("{message} (HTTP {status})")]
    Protocol { status: u16, message: String },

    /// Input rejected locally, before any remote call was issued.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not logged in")]
    Unauthenticated,

    #[error("Transition rejected: {0}")]
    Transition(#[from] TransitionError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Task join error: {0}")]
    TaskJoin(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
