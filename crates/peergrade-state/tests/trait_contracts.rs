//! Trait contract tests for EvaluationSource and GradeLedger.
//!
//! Every test runs against the in-memory fakes and the in-memory SurrealDB
//! backend; any conforming implementation must pass these.

use peergrade_state::fakes::{MemoryEvaluationSource, MemoryGradeLedger};
use peergrade_state::storage_traits::*;
use peergrade_state::{
    Allocation, Criterion, EvaluationSnapshot, GradeRecord, Rubric, ScoreItem, StorageError,
    Student, Submission, SurrealGradebook, Team,
};

fn snapshot(evaluation_id: i64) -> EvaluationSnapshot {
    EvaluationSnapshot {
        evaluation_id,
        rubric: Rubric {
            rubric_id: 3,
            scale_min: 1.0,
            scale_max: 5.0,
            criteria: vec![Criterion {
                id: 10,
                name: "Collaboration".to_string(),
                weight: 2.0,
                scale_min: 1.0,
                scale_max: 5.0,
            }],
        },
        students: vec![
            Student {
                user_id: 1,
                user_name: "Ada".to_string(),
                team_id: 100,
            },
            Student {
                user_id: 2,
                user_name: "Bo".to_string(),
                team_id: 100,
            },
        ],
        teams: vec![Team {
            team_id: 100,
            name: "Blue".to_string(),
            group_grade: Some(7.5),
        }],
        allocations: vec![Allocation {
            allocation_id: 500,
            reviewer_id: 2,
            reviewee_id: 1,
            is_self: false,
            criterion_ids: vec![10],
            completed: true,
        }],
        submissions: vec![Submission {
            allocation_id: 500,
            reviewer_id: 2,
            items: vec![ScoreItem {
                criterion_id: 10,
                score: 4.0,
                comment: Some("steady, helpful".to_string()),
            }],
        }],
    }
}

fn grade(evaluation_id: i64, user_id: i64, final_grade: f64) -> GradeRecord {
    GradeRecord {
        evaluation_id,
        user_id,
        user_name: format!("student-{user_id}"),
        suggested_grade: Some(final_grade),
        final_grade,
        overridden: false,
        reason: None,
    }
}

// ===========================================================================
// EvaluationSource
// ===========================================================================

async fn source_round_trip(source: &dyn EvaluationSource) {
    let snap = snapshot(42);
    source.store_snapshot(&snap).await.unwrap();
    let loaded = source.load_snapshot(42).await.unwrap();
    assert_eq!(loaded, snap);
}

async fn source_missing(source: &dyn EvaluationSource) {
    let err = source.load_snapshot(9_999).await.unwrap_err();
    assert!(matches!(
        err,
        StorageError::EvaluationNotFound {
            evaluation_id: 9_999
        }
    ));
}

async fn source_store_replaces(source: &dyn EvaluationSource) {
    let mut snap = snapshot(43);
    source.store_snapshot(&snap).await.unwrap();
    snap.teams[0].group_grade = Some(9.0);
    source.store_snapshot(&snap).await.unwrap();

    let loaded = source.load_snapshot(43).await.unwrap();
    assert_eq!(loaded.teams[0].group_grade, Some(9.0));
}

#[tokio::test]
async fn memory_source_contract() {
    let source = MemoryEvaluationSource::new();
    source_round_trip(&source).await;
    source_missing(&source).await;
    source_store_replaces(&source).await;
}

#[tokio::test]
async fn surreal_source_contract() {
    let source = SurrealGradebook::in_memory().await.unwrap();
    source_round_trip(&source).await;
    source_missing(&source).await;
    source_store_replaces(&source).await;
}

// ===========================================================================
// GradeLedger
// ===========================================================================

async fn ledger_replace_is_idempotent(ledger: &dyn GradeLedger) {
    let batch = vec![grade(7, 2, 8.0), grade(7, 1, 6.5)];
    ledger.replace_grades(7, &batch).await.unwrap();
    ledger.replace_grades(7, &batch).await.unwrap();

    let stored = ledger.grades(7).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].user_id, 1);
    assert_eq!(stored[1].user_id, 2);
    assert_eq!(stored[1].final_grade, 8.0);
}

async fn ledger_replace_drops_stale_rows(ledger: &dyn GradeLedger) {
    ledger
        .replace_grades(8, &[grade(8, 1, 5.0), grade(8, 2, 5.0)])
        .await
        .unwrap();
    ledger.replace_grades(8, &[grade(8, 1, 6.0)]).await.unwrap();

    let stored = ledger.grades(8).await.unwrap();
    assert_eq!(stored, vec![grade(8, 1, 6.0)]);
}

async fn ledger_duplicate_batch_rolls_back(ledger: &dyn GradeLedger) {
    ledger.replace_grades(9, &[grade(9, 1, 7.0)]).await.unwrap();

    let err = ledger
        .replace_grades(9, &[grade(9, 3, 4.0), grade(9, 3, 5.0)])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Transaction(_)));

    let stored = ledger.grades(9).await.unwrap();
    assert_eq!(stored, vec![grade(9, 1, 7.0)]);
}

async fn ledger_evaluations_are_isolated(ledger: &dyn GradeLedger) {
    ledger.replace_grades(10, &[grade(10, 1, 9.0)]).await.unwrap();
    ledger.replace_grades(11, &[]).await.unwrap();

    assert_eq!(ledger.grades(10).await.unwrap().len(), 1);
    assert!(ledger.grades(11).await.unwrap().is_empty());
    assert!(ledger.grades(12).await.unwrap().is_empty());
}

#[tokio::test]
async fn memory_ledger_contract() {
    let ledger = MemoryGradeLedger::new();
    ledger_replace_is_idempotent(&ledger).await;
    ledger_replace_drops_stale_rows(&ledger).await;
    ledger_duplicate_batch_rolls_back(&ledger).await;
    ledger_evaluations_are_isolated(&ledger).await;
}

#[tokio::test]
async fn surreal_ledger_contract() {
    let ledger = SurrealGradebook::in_memory().await.unwrap();
    ledger_replace_is_idempotent(&ledger).await;
    ledger_replace_drops_stale_rows(&ledger).await;
    ledger_duplicate_batch_rolls_back(&ledger).await;
    ledger_evaluations_are_isolated(&ledger).await;
}

#[tokio::test]
async fn memory_ledger_injected_failure_keeps_previous_set() {
    let ledger = MemoryGradeLedger::new();
    ledger.replace_grades(1, &[grade(1, 1, 6.0)]).await.unwrap();

    ledger.fail_next_write();
    let err = ledger
        .replace_grades(1, &[grade(1, 1, 9.0), grade(1, 2, 9.0)])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Transaction(_)));
    assert_eq!(ledger.grades(1).await.unwrap(), vec![grade(1, 1, 6.0)]);
    assert_eq!(ledger.committed_writes(), 1);

    // Fault is one-shot.
    ledger.replace_grades(1, &[grade(1, 1, 9.0)]).await.unwrap();
    assert_eq!(ledger.committed_writes(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_ledger_counts_concurrent_commits() {
    let ledger = std::sync::Arc::new(MemoryGradeLedger::new());
    let handles: Vec<_> = (1..=8)
        .map(|evaluation_id| {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                ledger
                    .replace_grades(evaluation_id, &[grade(evaluation_id, 1, 7.0)])
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(ledger.committed_writes(), 8);
}
