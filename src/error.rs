//! Error types for CaseLink.

use thiserror::Error;

/// Library-level error type for CaseLink operations.
#[derive(Error, Debug)]
pub enum CaseLinkError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The persisted index exists but could not be read. Callers start fresh.
    #[error("Failed to load similarity index: {0}")]
    Load(String),

    #[error("No index available. Generate a report from a video first.")]
    NoIndex,

    #[error("Report generation failed: {0}")]
    Generation(String),

    #[error("Failed to generate answer: {0}")]
    Answer(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Similarity index error: {0}")]
    Index(String),

    #[error("Report document error: {0}")]
    Document(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
}

impl CaseLinkError {
    /// Whether the session can carry on after this error.
    ///
    /// Only missing credentials stop an action before it starts; everything else is
    /// reported and the user may retry.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CaseLinkError::Config(_))
    }
}

/// Result type alias for CaseLink operations.
pub type Result<T> = std::result::Result<T, CaseLinkError>;
