//! Custom error types for ragdex

use thiserror::Error;

/// Main error type for ragdex operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Load error: {0}")]
    Load(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Embedding timed out after {0}s")]
    EmbeddingTimeout(u64),

    #[error("Collection '{0}' not found: run 'ragdex ingest' first")]
    CollectionNotFound(String),

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Not initialized: run 'ragdex init' first")]
    NotInitialized,

    #[error("Already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for ragdex
pub type Result<T> = std::result::Result<T, Error>;
