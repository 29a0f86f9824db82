//! Structured observability hooks for grading lifecycle events.
//!
//! This module provides:
//! - Evaluation-scoped tracing spans via the `EvaluationSpan` RAII guard
//! - Emission functions for computation, flagging and publish outcomes
//!
//! Events are emitted at `info!` level (filter with `PEERGRADE_LOG` or
//! `RUST_LOG`).

use tracing::{debug, info, warn};

use crate::domain::{EvaluationId, UserId};

/// RAII guard that enters an evaluation-scoped span.
///
/// # Example
///
/// ```ignore
/// let _span = EvaluationSpan::enter(42);
/// // events below carry evaluation_id = 42
/// ```
pub struct EvaluationSpan {
    _span: tracing::span::EnteredSpan,
}

impl EvaluationSpan {
    pub fn enter(evaluation_id: EvaluationId) -> Self {
        let span = tracing::info_span!("peergrade.evaluation", evaluation_id = evaluation_id);
        Self {
            _span: span.entered(),
        }
    }

    /// The underlying span, for re-entering on worker threads.
    pub fn span(&self) -> &tracing::Span {
        &self._span
    }
}

/// Emit event: aggregates and indices computed for an evaluation.
pub fn emit_evaluation_computed(evaluation_id: EvaluationId, students: usize, duration_ms: u64) {
    info!(
        event = "evaluation.computed",
        evaluation_id = evaluation_id,
        students = students,
        duration_ms = duration_ms,
    );
}

/// Emit event: indices and flags computed for one student (debug level).
/// Carries `evaluation_id` through the enclosing evaluation span.
pub fn emit_student_graded(user_id: UserId, reviewers: usize, flags: usize) {
    debug!(
        event = "student.graded",
        user_id = user_id,
        reviewers = reviewers,
        flags = flags,
    );
}

/// Emit event: flag rules evaluated.
pub fn emit_flags_evaluated(evaluation_id: EvaluationId, flags_raised: u64) {
    info!(
        event = "flags.evaluated",
        evaluation_id = evaluation_id,
        flags_raised = flags_raised,
    );
}

/// Emit event: a grade batch was committed.
pub fn emit_grades_published(
    evaluation_id: EvaluationId,
    grades: usize,
    overridden: usize,
    batch_digest: &str,
) {
    info!(
        event = "grades.published",
        evaluation_id = evaluation_id,
        grades = grades,
        overridden = overridden,
        batch_digest = %batch_digest,
    );
}

/// Emit event: a publish request was refused (warning level).
pub fn emit_publish_rejected(evaluation_id: EvaluationId, issues: usize) {
    warn!(
        event = "grades.publish_rejected",
        evaluation_id = evaluation_id,
        issues = issues,
    );
}
