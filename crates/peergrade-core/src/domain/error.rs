//! Domain-level error taxonomy for peergrade.

use peergrade_state::{AllocationId, CriterionId, EvaluationId, StorageError, TeamId, UserId};

use crate::publish::PublishIssue;

/// Input rejected before any aggregation runs. Every variant names the
/// offending field so callers can surface it directly.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: scale [{min}, {max}] is not a finite, non-empty interval")]
    InvalidScale {
        field: &'static str,
        min: f64,
        max: f64,
    },

    #[error("criteria[{criterion_id}].weight: {weight} must be a positive number")]
    NonPositiveWeight { criterion_id: CriterionId, weight: f64 },

    #[error("criteria[{criterion_id}]: scale lies outside the rubric scale")]
    CriterionOutOfRubricScale { criterion_id: CriterionId },

    #[error("criteria[{criterion_id}]: duplicate criterion id")]
    DuplicateCriterion { criterion_id: CriterionId },

    #[error("allocations[{allocation_id}].criterion_ids: unknown criterion {criterion_id}")]
    UnknownCriterion {
        allocation_id: AllocationId,
        criterion_id: CriterionId,
    },

    #[error("submissions[{allocation_id}].criterion_id: {criterion_id} is not part of the allocation")]
    CriterionNotAllocated {
        allocation_id: AllocationId,
        criterion_id: CriterionId,
    },

    #[error(
        "submissions[{allocation_id}].score: {score} for criterion {criterion_id} outside [{min}, {max}]"
    )]
    ScoreOutOfRange {
        allocation_id: AllocationId,
        criterion_id: CriterionId,
        score: f64,
        min: f64,
        max: f64,
    },

    #[error("submissions[{allocation_id}].criterion_id: criterion {criterion_id} scored twice")]
    DuplicateScore {
        allocation_id: AllocationId,
        criterion_id: CriterionId,
    },

    #[error("submissions.allocation_id: unknown allocation {allocation_id}")]
    UnknownAllocation { allocation_id: AllocationId },

    #[error("submissions[{allocation_id}]: more than one submission for the allocation")]
    DuplicateSubmission { allocation_id: AllocationId },

    #[error(
        "submissions[{allocation_id}].reviewer_id: allocation belongs to reviewer {expected}, not {actual}"
    )]
    ReviewerMismatch {
        allocation_id: AllocationId,
        expected: UserId,
        actual: UserId,
    },

    #[error("allocations[{allocation_id}].is_self: disagrees with reviewer/reviewee ids")]
    SelfAllocationMismatch { allocation_id: AllocationId },

    #[error("allocations[{allocation_id}]: duplicate allocation id")]
    DuplicateAllocation { allocation_id: AllocationId },

    #[error("allocations: reviewer {reviewer_id} already has an allocation for reviewee {reviewee_id}")]
    DuplicatePair {
        reviewer_id: UserId,
        reviewee_id: UserId,
    },

    #[error("{field}: unknown student {user_id}")]
    UnknownStudent { field: &'static str, user_id: UserId },

    #[error("students[{user_id}]: duplicate student id")]
    DuplicateStudent { user_id: UserId },

    #[error("teams[{team_id}]: duplicate team id")]
    DuplicateTeam { team_id: TeamId },

    #[error("students[{user_id}].team_id: unknown team {team_id}")]
    UnknownTeam { user_id: UserId, team_id: TeamId },

    #[error("teams[{team_id}].group_grade: {grade} outside [{min}, {max}]")]
    GroupGradeOutOfRange {
        team_id: TeamId,
        grade: f64,
        min: f64,
        max: f64,
    },

    #[error("{field}: value must be finite and non-negative")]
    NonFiniteInput { field: &'static str },

    #[error("{field}: {value} outside [{min}, {max}]")]
    InputOutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl ValidationError {
    /// Name of the offending input field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidScale { field, .. }
            | Self::UnknownStudent { field, .. }
            | Self::NonFiniteInput { field }
            | Self::InputOutOfRange { field, .. } => *field,
            Self::NonPositiveWeight { .. } => "criteria.weight",
            Self::CriterionOutOfRubricScale { .. } => "criteria.scale",
            Self::DuplicateCriterion { .. } => "criteria.id",
            Self::UnknownCriterion { .. } => "allocations.criterion_ids",
            Self::CriterionNotAllocated { .. } | Self::DuplicateScore { .. } => {
                "submissions.items.criterion_id"
            }
            Self::ScoreOutOfRange { .. } => "submissions.items.score",
            Self::UnknownAllocation { .. } | Self::DuplicateSubmission { .. } => {
                "submissions.allocation_id"
            }
            Self::ReviewerMismatch { .. } => "submissions.reviewer_id",
            Self::SelfAllocationMismatch { .. } => "allocations.is_self",
            Self::DuplicateAllocation { .. } => "allocations.allocation_id",
            Self::DuplicatePair { .. } => "allocations.reviewee_id",
            Self::DuplicateStudent { .. } => "students.user_id",
            Self::DuplicateTeam { .. } => "teams.team_id",
            Self::UnknownTeam { .. } => "students.team_id",
            Self::GroupGradeOutOfRange { .. } => "teams.group_grade",
        }
    }
}

/// peergrade domain errors.
#[derive(Debug, thiserror::Error)]
pub enum PeerGradeError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("publish rejected for evaluation {evaluation_id}: {} issue(s)", .issues.len())]
    PublishRejected {
        evaluation_id: EvaluationId,
        issues: Vec<PublishIssue>,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for peergrade domain operations.
pub type Result<T> = std::result::Result<T, PeerGradeError>;
