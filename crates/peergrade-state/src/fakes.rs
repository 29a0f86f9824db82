//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryEvaluationSource` and `MemoryGradeLedger` that satisfy
//! the trait contracts without any external dependencies.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::records::{EvaluationId, EvaluationSnapshot, GradeRecord};
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryEvaluationSource
// ---------------------------------------------------------------------------

/// In-memory snapshot store backed by a `HashMap<evaluation_id, snapshot>`.
#[derive(Debug, Default)]
pub struct MemoryEvaluationSource {
    snapshots: Mutex<HashMap<EvaluationId, EvaluationSnapshot>>,
}

impl MemoryEvaluationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor seeded with one snapshot.
    pub fn with_snapshot(snapshot: EvaluationSnapshot) -> Self {
        let source = Self::new();
        source
            .snapshots
            .lock()
            .unwrap()
            .insert(snapshot.evaluation_id, snapshot);
        source
    }
}

#[async_trait]
impl EvaluationSource for MemoryEvaluationSource {
    async fn load_snapshot(
        &self,
        evaluation_id: EvaluationId,
    ) -> StorageResult<EvaluationSnapshot> {
        let snapshots = self.snapshots.lock().unwrap();
        snapshots
            .get(&evaluation_id)
            .cloned()
            .ok_or(StorageError::EvaluationNotFound { evaluation_id })
    }

    async fn store_snapshot(&self, snapshot: &EvaluationSnapshot) -> StorageResult<()> {
        let mut snapshots = self.snapshots.lock().unwrap();
        snapshots.insert(snapshot.evaluation_id, snapshot.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryGradeLedger
// ---------------------------------------------------------------------------

/// In-memory grade ledger backed by a `HashMap<evaluation_id, Vec<GradeRecord>>`.
///
/// The batch is staged and swapped in under a single lock, so a failed write
/// never leaves a partial set behind. [`MemoryGradeLedger::fail_next_write`]
/// injects one failure for rollback tests.
#[derive(Debug, Default)]
pub struct MemoryGradeLedger {
    grades: Mutex<HashMap<EvaluationId, Vec<GradeRecord>>>,
    fail_next: AtomicBool,
    writes: AtomicU64,
}

impl MemoryGradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `replace_grades` call fail after staging.
    pub fn fail_next_write(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Number of committed batches.
    pub fn committed_writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GradeLedger for MemoryGradeLedger {
    async fn replace_grades(
        &self,
        evaluation_id: EvaluationId,
        grades: &[GradeRecord],
    ) -> StorageResult<()> {
        let mut staged: Vec<GradeRecord> = grades.to_vec();
        staged.sort_by_key(|g| g.user_id);

        if let Some(pair) = staged.windows(2).find(|w| w[0].user_id == w[1].user_id) {
            return Err(StorageError::Transaction(format!(
                "duplicate grade for user {} in evaluation {}",
                pair[0].user_id, evaluation_id
            )));
        }
        if let Some(stray) = staged.iter().find(|g| g.evaluation_id != evaluation_id) {
            return Err(StorageError::Transaction(format!(
                "grade for user {} belongs to evaluation {}, not {}",
                stray.user_id, stray.evaluation_id, evaluation_id
            )));
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StorageError::Transaction(
                "injected failure before commit".to_string(),
            ));
        }

        let mut store = self.grades.lock().unwrap();
        store.insert(evaluation_id, staged);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn grades(&self, evaluation_id: EvaluationId) -> StorageResult<Vec<GradeRecord>> {
        let store = self.grades.lock().unwrap();
        Ok(store.get(&evaluation_id).cloned().unwrap_or_default())
    }
}
