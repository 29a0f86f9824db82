//! SurrealDB schema initialization
//!
//! Defines the `evaluations` and `grades` tables with their indexes.
//! Safe to call on every connect (definitions are idempotent).

use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::storage_traits::StorageResult;

/// Initialize all peergrade tables.
pub async fn init_schema(db: &Surreal<Any>) -> StorageResult<()> {
    info!("Initializing peergrade SurrealDB schema");

    init_evaluations_table(db).await?;
    init_grades_table(db).await?;

    info!("peergrade schema initialization complete");
    Ok(())
}

/// `evaluations` table: one document per evaluation.
///
/// ```text
/// TABLE evaluations {
///   evaluation_id: INT    (unique)
///   snapshot_json: STRING (serialized EvaluationSnapshot)
/// }
/// ```
async fn init_evaluations_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing evaluations table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS evaluations SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_evaluation_id ON TABLE evaluations COLUMNS evaluation_id UNIQUE;
    "#;

    db.query(sql).await?.check()?;
    Ok(())
}

/// `grades` table: one row per (evaluation, student).
///
/// ```text
/// TABLE grades {
///   evaluation_id:   INT
///   user_id:         INT
///   user_name:       STRING
///   suggested_grade: FLOAT?
///   final_grade:     FLOAT
///   overridden:      BOOL
///   reason:          STRING?
/// }
/// ```
///
/// `(evaluation_id, user_id)` is unique, so a batch carrying a duplicate
/// student fails its transaction instead of double-grading.
async fn init_grades_table(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing grades table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS grades SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_grade_student ON TABLE grades COLUMNS evaluation_id, user_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_grade_evaluation ON TABLE grades COLUMNS evaluation_id;
    "#;

    db.query(sql).await?.check()?;
    Ok(())
}
