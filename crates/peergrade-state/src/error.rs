//! Error types for peergrade-state

use thiserror::Error;

use crate::records::EvaluationId;

/// Errors returned by [`crate::EvaluationSource`] and [`crate::GradeLedger`]
/// implementations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// No snapshot stored for the evaluation
    #[error("evaluation not found: {evaluation_id}")]
    EvaluationNotFound { evaluation_id: EvaluationId },

    /// Connection or query failure in the backing store
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A batch write was rolled back; nothing was persisted
    #[error("transaction rolled back: {0}")]
    Transaction(String),

    /// Record could not be encoded or decoded
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
