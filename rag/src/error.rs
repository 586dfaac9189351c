use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} environment variable is not set.")]
    MissingEnv(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("resources directory not found: {}", .0.display())]
    ResourcesNotFound(PathBuf),

    #[error("no PDF documents found in {}", .0.display())]
    NoDocuments(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read PDF {}: {source}", path.display())]
    Pdf {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned {status}: {body}")]
    Service {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} response could not be decoded: {source} | {body}")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error("index not found: {0}")]
    IndexNotFound(String),

    #[error("index {0} did not become ready in time")]
    IndexNotReady(String),

    #[error("embedding service returned {actual} vectors for {expected} inputs")]
    EmbeddingCount { expected: usize, actual: usize },

    #[error("query must not be empty")]
    EmptyQuery,
}

impl Error {
    /// True for errors raised before any hosted service is contacted.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::MissingEnv(_) | Error::InvalidConfig(_))
    }
}
