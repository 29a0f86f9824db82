//! Evaluation pipeline.
//!
//! Runs validation and the three grading phases over one snapshot:
//!
//! 1. per-student aggregates (parallel, no shared state)
//! 2. per-team mean peer average
//! 3. per-student indices and flags (parallel)
//!
//! Phases are kept separate so each can be tested on its own; the team pass
//! is the only cross-student dependency.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate, completed_allocations_for, StudentAggregate, SubmissionIndex};
use crate::config::GradingConfig;
use crate::domain::{
    validate_snapshot, EvaluationId, EvaluationSnapshot, Result, Rubric, Student, Team, TeamId,
    UserId,
};
use crate::flags::{evaluate_flags, Flag};
use crate::indices::{compute_indices, team_peer_means, ContributionIndices};
use crate::metrics::METRICS;
use crate::obs;

/// Everything computed for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentResult {
    pub student: Student,
    pub group_grade: Option<f64>,
    pub aggregate: StudentAggregate,
    pub indices: ContributionIndices,
    pub flags: Vec<Flag>,
}

/// Result of grading one evaluation. `results` are ordered by
/// `(user_name, user_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub evaluation_id: EvaluationId,
    pub rubric: Rubric,
    pub results: Vec<StudentResult>,
    /// Mean peer average per team, over members with at least one peer score.
    pub team_means: BTreeMap<TeamId, f64>,
}

impl EvaluationResult {
    pub fn student(&self, user_id: UserId) -> Option<&StudentResult> {
        self.results.iter().find(|r| r.student.user_id == user_id)
    }

    pub fn flag_count(&self) -> usize {
        self.results.iter().map(|r| r.flags.len()).sum()
    }
}

/// Validate `snapshot` and compute aggregates, indices and flags for every
/// student in it.
pub fn compute_evaluation(
    snapshot: &EvaluationSnapshot,
    config: &GradingConfig,
) -> Result<EvaluationResult> {
    let evaluation_span = obs::EvaluationSpan::enter(snapshot.evaluation_id);
    // Rayon workers do not inherit the caller's span; re-enter it per task.
    let span = evaluation_span.span();
    let started = Instant::now();

    validate_snapshot(snapshot, &config.grade_scale)?;

    let index = SubmissionIndex::build(snapshot);
    let teams: HashMap<TeamId, &Team> = snapshot.teams.iter().map(|t| (t.team_id, t)).collect();

    let mut students: Vec<&Student> = snapshot.students.iter().collect();
    students.sort_by(|a, b| {
        a.user_name
            .cmp(&b.user_name)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });

    // Phase 1: aggregates.
    let aggregates: Vec<StudentAggregate> = students
        .par_iter()
        .map(|student| {
            let _entered = span.enter();
            let scored = completed_allocations_for(snapshot, &index, student.user_id);
            aggregate(student.user_id, &scored, &snapshot.rubric)
        })
        .collect();
    METRICS.add_students_aggregated(aggregates.len() as u64);

    // Phase 2: team means.
    let team_means = team_peer_means(
        students
            .iter()
            .zip(aggregates.iter())
            .map(|(student, agg)| (student.team_id, agg)),
    );

    // Phase 3: indices and flags.
    let results: Vec<StudentResult> = students
        .par_iter()
        .zip(aggregates.into_par_iter())
        .map(|(student, aggregate)| -> Result<StudentResult> {
            let _entered = span.enter();
            let group_grade = teams.get(&student.team_id).and_then(|t| t.group_grade);
            let indices = compute_indices(
                &aggregate,
                team_means.get(&student.team_id).copied(),
                group_grade,
                &config.ratio,
                &config.grade_scale,
            )?;
            let flags = evaluate_flags(&aggregate, &indices, &config.flags);
            obs::emit_student_graded(student.user_id, aggregate.reviewers_count, flags.len());
            Ok(StudentResult {
                student: (*student).clone(),
                group_grade,
                aggregate,
                indices,
                flags,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let result = EvaluationResult {
        evaluation_id: snapshot.evaluation_id,
        rubric: snapshot.rubric.clone(),
        results,
        team_means,
    };

    let flags_raised = result.flag_count() as u64;
    METRICS.add_flags_raised(flags_raised);
    obs::emit_evaluation_computed(
        result.evaluation_id,
        result.results.len(),
        started.elapsed().as_millis() as u64,
    );
    obs::emit_flags_evaluated(result.evaluation_id, flags_raised);

    Ok(result)
}
