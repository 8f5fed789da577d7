use std::io;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SpanError>;

/// Errors that abort a span computation.
///
/// An optimizer that cannot produce a plan is not an error: it is reported as
/// [`Plan::Failed`](crate::plan::Plan::Failed) and classified like any other
/// plan. Everything here is fatal for the query being searched.
#[derive(Debug, Error)]
pub enum SpanError {
    /// The connector could not be constructed or lost its transport.
    #[error("connector error: {0}")]
    Connector(String),
    /// The explain worker pool could not be started.
    #[error("worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    /// The persistence layer rejected a statement.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// A fixture or report could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Caller supplied an unusable argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl SpanError {
    pub(crate) fn connector(message: impl Into<String>) -> Self {
        SpanError::Connector(message.into())
    }
}

impl From<serde_json::Error> for SpanError {
    fn from(err: serde_json::Error) -> Self {
        SpanError::Serialization(err.to_string())
    }
}
