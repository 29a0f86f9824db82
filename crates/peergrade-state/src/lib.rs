//! peergrade-state: persistence for peer evaluation grading
//!
//! Holds the canonical records (rubric, allocations, submissions, published
//! grades) and the storage seams the grading core reads from and writes to.
//!
//! ## Key Components
//!
//! - `EvaluationSource`: committed allocations and scores per evaluation
//! - `GradeLedger`: atomic, idempotent grade batch persistence
//! - `SurrealGradebook`: SurrealDB implementation of both
//! - `fakes`: in-memory implementations for tests

mod error;
pub mod fakes;
mod migrations;
pub mod records;
pub mod storage_traits;
pub mod surreal_gradebook;

pub use error::StorageError;
pub use records::{
    Allocation, AllocationId, Criterion, CriterionId, EvaluationId, EvaluationSnapshot,
    GradeRecord, Rubric, RubricId, ScaleBounds, ScoreItem, Student, Submission, Team, TeamId,
    UserId,
};
pub use storage_traits::{EvaluationSource, GradeLedger, StorageResult};
pub use surreal_gradebook::SurrealGradebook;
