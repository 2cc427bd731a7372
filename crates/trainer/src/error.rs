//! Trainer error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("Configuration error: {0}")]
    Config(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: HTTP {0}")]
    Api(reqwest::StatusCode),

    #[error("Empty response from collaborator")]
    EmptyResponse,

    #[error("Collaborator error: {0}")]
    Collaborator(String),
}
