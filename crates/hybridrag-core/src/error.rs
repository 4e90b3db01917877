use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Embedding failed: {0}")]
    EmbeddingFailure(String),

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Generation failed: {0}")]
    Generation(String),
}

/// Discriminant of [`Error`], for callers that branch on the failure class
/// without caring about the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    StoreUnavailable,
    EmbeddingFailure,
    ConfigurationMissing,
    InvalidConfig,
    Generation,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            Error::EmbeddingFailure(_) => ErrorKind::EmbeddingFailure,
            Error::ConfigurationMissing(_) => ErrorKind::ConfigurationMissing,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Error::Generation(_) => ErrorKind::Generation,
        }
    }

    pub fn store<E: std::fmt::Display>(e: E) -> Self { Error::StoreUnavailable(e.to_string()) }

    pub fn embedding<E: std::fmt::Display>(e: E) -> Self { Error::EmbeddingFailure(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, Error>;
