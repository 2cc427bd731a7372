//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid square: {0:?}")]
    InvalidSquare(String),

    #[error("Invalid piece letter: {0:?}")]
    InvalidPiece(char),

    #[error("Invalid color: {0:?}")]
    InvalidColor(String),

    #[error("Unknown opening: {0}")]
    UnknownOpening(String),

    #[error("Invalid opening catalog: {0}")]
    InvalidCatalog(String),

    #[error("Catalog JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Catalog read error: {0}")]
    Io(#[from] std::io::Error),
}
