use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::industry::UnknownIndustry;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding backend returned {status}: {details}")]
    Backend { status: u16, details: String },

    #[error("embedding request timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("backend returned {returned} embeddings for {requested} inputs")]
    CountMismatch { requested: usize, returned: usize },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion backend returned {status}: {details}")]
    Backend { status: u16, details: String },

    #[error("completion request timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("completion backend returned no choices")]
    EmptyCompletion,

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no index at {}", .0.display())]
    Missing(PathBuf),

    #[error("vector dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding count {vectors} does not match chunk count {chunks}")]
    CountMismatch { chunks: usize, vectors: usize },

    #[error("index was built with embedding model {expected:?}, not {actual:?}")]
    ModelMismatch { expected: String, actual: String },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    UnknownIndustry(#[from] UnknownIndustry),

    #[error("only pdf uploads are accepted, got {0:?}")]
    NotAPdf(String),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("embedding failed: {0}")]
    Embed(#[from] EmbedError),

    #[error("index write failed: {0}")]
    Index(#[from] IndexError),
}

#[derive(Debug, Error)]
pub enum AskError {
    #[error(transparent)]
    UnknownIndustry(#[from] UnknownIndustry),

    #[error("question cannot be empty")]
    EmptyQuestion,

    #[error("question must be at most {limit} characters, got {length}")]
    QuestionTooLong { length: usize, limit: usize },

    #[error("no documents ingested yet (expected index at {})", .0.display())]
    IndexNotFound(PathBuf),

    #[error("embedding failed: {0}")]
    Embed(#[from] EmbedError),

    #[error("index read failed: {0}")]
    Index(#[from] IndexError),

    #[error("answer generation failed: {0}")]
    Generation(#[from] GenerationError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
