//! Storage trait definitions for peergrade
//!
//! - `EvaluationSource`: read (and seed) the allocation/score snapshot of an
//!   evaluation
//! - `GradeLedger`: all-or-nothing persistence of published grade batches
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::records::{EvaluationId, EvaluationSnapshot, GradeRecord};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// EvaluationSource: allocations and scores
// ---------------------------------------------------------------------------

/// Source of committed allocations and scores.
///
/// Guarantees:
/// - `load_snapshot` returns a consistent view; the grading core never
///   re-reads during a computation.
/// - `store_snapshot` replaces the snapshot for its evaluation id.
#[async_trait]
pub trait EvaluationSource: Send + Sync {
    /// Fetch the snapshot. Returns `StorageError::EvaluationNotFound` if absent.
    async fn load_snapshot(&self, evaluation_id: EvaluationId)
        -> StorageResult<EvaluationSnapshot>;

    /// Insert or replace the snapshot for `snapshot.evaluation_id`.
    async fn store_snapshot(&self, snapshot: &EvaluationSnapshot) -> StorageResult<()>;
}

// ---------------------------------------------------------------------------
// GradeLedger: published grades
// ---------------------------------------------------------------------------

/// Persisted final grades.
///
/// Semantics:
/// - `replace_grades` is atomic: on success the evaluation's grade set is
///   exactly `grades`; on failure the previous set is untouched.
/// - Replacing with an identical batch is a no-op in effect (no duplicate
///   records), so publishing is idempotent.
/// - `grades` returns records ordered by `user_id`.
#[async_trait]
pub trait GradeLedger: Send + Sync {
    async fn replace_grades(
        &self,
        evaluation_id: EvaluationId,
        grades: &[GradeRecord],
    ) -> StorageResult<()>;

    async fn grades(&self, evaluation_id: EvaluationId) -> StorageResult<Vec<GradeRecord>>;
}
