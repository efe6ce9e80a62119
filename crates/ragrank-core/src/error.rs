use std::time::Duration;

use thiserror::Error;

use crate::types::SourceKind;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Query text must not be empty")]
    EmptyQuery,

    #[error("Source unavailable ({source_kind}): {reason}")]
    SourceUnavailable { source_kind: SourceKind, reason: String },

    #[error("Rerank model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Invalid fusion configuration: {0}")]
    FusionConfig(String),

    #[error("{what} timed out after {after:?}")]
    Timeout { what: String, after: Duration },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Duplicate chunk id '{0}'")]
    DuplicateChunk(String),
}

impl RetrievalError {
    /// Errors a caller must act on. Everything else is absorbed by degrading
    /// the pipeline.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::EmptyQuery | Self::FusionConfig(_) | Self::InvalidConfig(_) | Self::DuplicateChunk(_))
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
