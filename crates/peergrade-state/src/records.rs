//! Canonical records shared by the evaluation store and the grading core.
//!
//! Raw scores are the source of truth: a [`EvaluationSnapshot`] holds every
//! allocation and submission of one evaluation, read once per request.
//! Aggregates and indices are always recomputed from it and never stored.
//! The only derived data that is persisted is the published [`GradeRecord`]
//! list.

use serde::{Deserialize, Serialize};

pub type EvaluationId = i64;
pub type UserId = i64;
pub type CriterionId = i64;
pub type AllocationId = i64;
pub type TeamId = i64;
pub type RubricId = i64;

// ---------------------------------------------------------------------------
// Rubric
// ---------------------------------------------------------------------------

/// Closed numeric interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleBounds {
    pub min: f64,
    pub max: f64,
}

impl ScaleBounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Finite and non-empty.
    pub fn is_well_formed(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// One weighted rubric criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: CriterionId,
    pub name: String,
    /// Positive weight; the rubric total is arbitrary and normalised at
    /// aggregation time.
    pub weight: f64,
    pub scale_min: f64,
    pub scale_max: f64,
}

impl Criterion {
    pub fn scale(&self) -> ScaleBounds {
        ScaleBounds::new(self.scale_min, self.scale_max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    pub rubric_id: RubricId,
    pub scale_min: f64,
    pub scale_max: f64,
    pub criteria: Vec<Criterion>,
}

impl Rubric {
    pub fn scale(&self) -> ScaleBounds {
        ScaleBounds::new(self.scale_min, self.scale_max)
    }

    pub fn criterion(&self, id: CriterionId) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.id == id)
    }
}

// ---------------------------------------------------------------------------
// Allocations and scores
// ---------------------------------------------------------------------------

/// A single rating on one criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreItem {
    pub criterion_id: CriterionId,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Unit of work assigned to a reviewer: which reviewee and which criteria.
///
/// Exactly one allocation exists per `(reviewer_id, reviewee_id)` pair in an
/// evaluation. Self allocations have `reviewer_id == reviewee_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub allocation_id: AllocationId,
    pub reviewer_id: UserId,
    pub reviewee_id: UserId,
    pub is_self: bool,
    pub criterion_ids: Vec<CriterionId>,
    pub completed: bool,
}

/// Score items submitted by `reviewer_id` for one allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub allocation_id: AllocationId,
    pub reviewer_id: UserId,
    pub items: Vec<ScoreItem>,
}

// ---------------------------------------------------------------------------
// Cohort
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub user_id: UserId,
    pub user_name: String,
    pub team_id: TeamId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub team_id: TeamId,
    pub name: String,
    /// Shared project grade the team earned, on the grade scale.
    #[serde(default)]
    pub group_grade: Option<f64>,
}

/// Everything needed to grade one evaluation, fetched once per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSnapshot {
    pub evaluation_id: EvaluationId,
    pub rubric: Rubric,
    pub students: Vec<Student>,
    pub teams: Vec<Team>,
    pub allocations: Vec<Allocation>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
}

// ---------------------------------------------------------------------------
// Published grades
// ---------------------------------------------------------------------------

/// A persisted final grade for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub evaluation_id: EvaluationId,
    pub user_id: UserId,
    pub user_name: String,
    /// System suggestion (rounded to one decimal), if the team had a group grade.
    #[serde(default)]
    pub suggested_grade: Option<f64>,
    pub final_grade: f64,
    /// Whether `final_grade` came from a teacher override.
    pub overridden: bool,
    #[serde(default)]
    pub reason: Option<String>,
}
