//! Error types for the concord crate.

use thiserror::Error;

/// The error type for all corpus analytics operations.
#[derive(Error, Debug)]
pub enum ConcordError {
    /// A request parameter was missing or invalid.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A query string could not be parsed.
    #[error("Malformed query '{query}': {message}")]
    MalformedQuery { query: String, message: String },

    /// A document reference resolved outside the mapped corpus.
    ///
    /// This is always a scoping defect, not a user-recoverable condition.
    #[error("Document {doc} is not part of corpus '{corpus_id}'")]
    NotInCorpus { doc: u64, corpus_id: String },

    /// A read from the index backend failed.
    #[error("Index error: {0}")]
    Index(String),

    /// A read or write against the storage backend failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A requested stored entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// An internal invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConcordError {
    /// Create an invalid argument error.
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        ConcordError::InvalidArgument(message.into())
    }

    /// Create a malformed query error.
    pub fn malformed_query<Q: Into<String>, M: Into<String>>(query: Q, message: M) -> Self {
        ConcordError::MalformedQuery {
            query: query.into(),
            message: message.into(),
        }
    }

    /// Create a not-in-corpus error.
    pub fn not_in_corpus<S: Into<String>>(doc: u64, corpus_id: S) -> Self {
        ConcordError::NotInCorpus {
            doc,
            corpus_id: corpus_id.into(),
        }
    }

    /// Create an index error.
    pub fn index<S: Into<String>>(message: S) -> Self {
        ConcordError::Index(message.into())
    }

    /// Create a storage error.
    pub fn storage<S: Into<String>>(message: S) -> Self {
        ConcordError::Storage(message.into())
    }

    /// Create a not-found error.
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        ConcordError::NotFound(message.into())
    }

    /// Create an internal error.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        ConcordError::Internal(message.into())
    }
}

/// A specialized `Result` type for corpus analytics operations.
pub type Result<T> = std::result::Result<T, ConcordError>;
