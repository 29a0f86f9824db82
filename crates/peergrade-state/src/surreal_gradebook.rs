//! SurrealDB-backed `EvaluationSource` + `GradeLedger`
//!
//! Snapshots are stored as one JSON document per evaluation. Grade batches
//! are written inside a single `BEGIN TRANSACTION … COMMIT TRANSACTION`
//! block that first deletes the evaluation's previous grades, so a failed
//! batch rolls back completely and a repeated batch replaces rather than
//! duplicates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::migrations;
use crate::records::{EvaluationId, EvaluationSnapshot, GradeRecord};
use crate::storage_traits::{EvaluationSource, GradeLedger, StorageResult};

const NAMESPACE: &str = "peergrade";
const DATABASE: &str = "main";

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRow {
    evaluation_id: EvaluationId,
    snapshot_json: String,
}

/// SurrealDB-backed gradebook. Cloning shares the connection.
#[derive(Clone)]
pub struct SurrealGradebook {
    db: Surreal<Any>,
}

impl SurrealGradebook {
    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> StorageResult<Self> {
        Self::connect("mem://").await
    }

    /// Connect to any SurrealDB endpoint (`mem://`, `surrealkv://path`,
    /// `ws://host:port`), select `peergrade/main` and initialize the schema.
    pub async fn connect(url: &str) -> StorageResult<Self> {
        if let Some(path) = url.strip_prefix("surrealkv://") {
            std::fs::create_dir_all(path).map_err(|e| {
                StorageError::Backend(format!(
                    "failed to create database directory {}: {}",
                    path, e
                ))
            })?;
        }

        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StorageError::Backend(format!("failed to connect to {}: {}", url, e)))?;

        db.use_ns(NAMESPACE).use_db(DATABASE).await?;

        migrations::init_schema(&db).await?;

        info!(url = %url, "SurrealGradebook connected");
        Ok(Self { db })
    }
}

#[async_trait]
impl EvaluationSource for SurrealGradebook {
    async fn load_snapshot(
        &self,
        evaluation_id: EvaluationId,
    ) -> StorageResult<EvaluationSnapshot> {
        let mut res = self
            .db
            .query("SELECT evaluation_id, snapshot_json FROM evaluations WHERE evaluation_id = $eval")
            .bind(("eval", evaluation_id))
            .await?;

        let rows: Vec<SnapshotRow> = res.take(0)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or(StorageError::EvaluationNotFound { evaluation_id })?;

        Ok(serde_json::from_str(&row.snapshot_json)?)
    }

    async fn store_snapshot(&self, snapshot: &EvaluationSnapshot) -> StorageResult<()> {
        let row = SnapshotRow {
            evaluation_id: snapshot.evaluation_id,
            snapshot_json: serde_json::to_string(snapshot)?,
        };

        debug!(evaluation_id = snapshot.evaluation_id, "storing snapshot");

        self.db
            .query("UPSERT type::thing('evaluations', $eval) CONTENT $row")
            .bind(("eval", snapshot.evaluation_id))
            .bind(("row", row))
            .await?
            .check()?;

        Ok(())
    }
}

#[async_trait]
impl GradeLedger for SurrealGradebook {
    async fn replace_grades(
        &self,
        evaluation_id: EvaluationId,
        grades: &[GradeRecord],
    ) -> StorageResult<()> {
        let sql = if grades.is_empty() {
            r#"
                BEGIN TRANSACTION;
                DELETE grades WHERE evaluation_id = $eval;
                COMMIT TRANSACTION;
            "#
        } else {
            r#"
                BEGIN TRANSACTION;
                DELETE grades WHERE evaluation_id = $eval;
                INSERT INTO grades $rows;
                COMMIT TRANSACTION;
            "#
        };

        debug!(
            evaluation_id = evaluation_id,
            count = grades.len(),
            "replacing grade batch"
        );

        self.db
            .query(sql)
            .bind(("eval", evaluation_id))
            .bind(("rows", grades.to_vec()))
            .await?
            .check()
            .map_err(|e| StorageError::Transaction(e.to_string()))?;

        Ok(())
    }

    async fn grades(&self, evaluation_id: EvaluationId) -> StorageResult<Vec<GradeRecord>> {
        let mut res = self
            .db
            .query(
                "SELECT evaluation_id, user_id, user_name, suggested_grade, final_grade, \
                 overridden, reason FROM grades WHERE evaluation_id = $eval ORDER BY user_id ASC",
            )
            .bind(("eval", evaluation_id))
            .await?;

        let rows: Vec<GradeRecord> = res.take(0)?;
        Ok(rows)
    }
}
