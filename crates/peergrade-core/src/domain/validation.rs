//! Snapshot validation.
//!
//! Runs before any aggregation. The first violation found is returned and
//! nothing downstream sees a partially valid snapshot.

use std::collections::{HashMap, HashSet};

use peergrade_state::{
    Allocation, AllocationId, CriterionId, EvaluationSnapshot, ScaleBounds, UserId,
};

use super::error::ValidationError;

/// Validate a snapshot against its own rubric and the grade scale.
///
/// Checks, in order:
/// 1. Rubric scale is a finite, non-empty interval.
/// 2. Criteria: unique ids, positive weights, scale inside the rubric scale.
/// 3. Teams unique; group grades (if set) inside `grade_scale`.
/// 4. Students unique, each in a known team.
/// 5. Allocations: unique ids, one per (reviewer, reviewee), `is_self`
///    consistent, known students, known criteria.
/// 6. Submissions: existing allocation owned by the submitter, at most one
///    per allocation, allocated criteria only, each scored once and inside
///    the criterion scale.
pub fn validate_snapshot(
    snapshot: &EvaluationSnapshot,
    grade_scale: &ScaleBounds,
) -> Result<(), ValidationError> {
    let rubric = &snapshot.rubric;
    let rubric_scale = rubric.scale();
    if !rubric_scale.is_well_formed() {
        return Err(ValidationError::InvalidScale {
            field: "rubric.scale",
            min: rubric_scale.min,
            max: rubric_scale.max,
        });
    }

    let mut criterion_scales: HashMap<CriterionId, ScaleBounds> = HashMap::new();
    for criterion in &rubric.criteria {
        if !(criterion.weight.is_finite() && criterion.weight > 0.0) {
            return Err(ValidationError::NonPositiveWeight {
                criterion_id: criterion.id,
                weight: criterion.weight,
            });
        }
        let scale = criterion.scale();
        if !scale.is_well_formed() {
            return Err(ValidationError::InvalidScale {
                field: "criteria.scale",
                min: scale.min,
                max: scale.max,
            });
        }
        if !(rubric_scale.contains(scale.min) && rubric_scale.contains(scale.max)) {
            return Err(ValidationError::CriterionOutOfRubricScale {
                criterion_id: criterion.id,
            });
        }
        if criterion_scales.insert(criterion.id, scale).is_some() {
            return Err(ValidationError::DuplicateCriterion {
                criterion_id: criterion.id,
            });
        }
    }

    let mut team_ids = HashSet::new();
    for team in &snapshot.teams {
        if !team_ids.insert(team.team_id) {
            return Err(ValidationError::DuplicateTeam {
                team_id: team.team_id,
            });
        }
        if let Some(grade) = team.group_grade {
            if !(grade.is_finite() && grade_scale.contains(grade)) {
                return Err(ValidationError::GroupGradeOutOfRange {
                    team_id: team.team_id,
                    grade,
                    min: grade_scale.min,
                    max: grade_scale.max,
                });
            }
        }
    }

    let mut student_ids: HashSet<UserId> = HashSet::new();
    for student in &snapshot.students {
        if !student_ids.insert(student.user_id) {
            return Err(ValidationError::DuplicateStudent {
                user_id: student.user_id,
            });
        }
        if !team_ids.contains(&student.team_id) {
            return Err(ValidationError::UnknownTeam {
                user_id: student.user_id,
                team_id: student.team_id,
            });
        }
    }

    let mut allocations: HashMap<AllocationId, &Allocation> = HashMap::new();
    let mut pairs: HashSet<(UserId, UserId)> = HashSet::new();
    for allocation in &snapshot.allocations {
        check_allocation(allocation, &student_ids, &criterion_scales)?;
        if allocations
            .insert(allocation.allocation_id, allocation)
            .is_some()
        {
            return Err(ValidationError::DuplicateAllocation {
                allocation_id: allocation.allocation_id,
            });
        }
        if !pairs.insert((allocation.reviewer_id, allocation.reviewee_id)) {
            return Err(ValidationError::DuplicatePair {
                reviewer_id: allocation.reviewer_id,
                reviewee_id: allocation.reviewee_id,
            });
        }
    }

    let mut submitted: HashSet<AllocationId> = HashSet::new();
    for submission in &snapshot.submissions {
        let allocation = allocations.get(&submission.allocation_id).ok_or(
            ValidationError::UnknownAllocation {
                allocation_id: submission.allocation_id,
            },
        )?;
        if allocation.reviewer_id != submission.reviewer_id {
            return Err(ValidationError::ReviewerMismatch {
                allocation_id: allocation.allocation_id,
                expected: allocation.reviewer_id,
                actual: submission.reviewer_id,
            });
        }
        if !submitted.insert(submission.allocation_id) {
            return Err(ValidationError::DuplicateSubmission {
                allocation_id: submission.allocation_id,
            });
        }

        let mut scored: HashSet<CriterionId> = HashSet::new();
        for item in &submission.items {
            if !allocation.criterion_ids.contains(&item.criterion_id) {
                return Err(ValidationError::CriterionNotAllocated {
                    allocation_id: allocation.allocation_id,
                    criterion_id: item.criterion_id,
                });
            }
            if !scored.insert(item.criterion_id) {
                return Err(ValidationError::DuplicateScore {
                    allocation_id: allocation.allocation_id,
                    criterion_id: item.criterion_id,
                });
            }
            // Allocated criteria were already checked against the rubric.
            let scale = criterion_scales[&item.criterion_id];
            if !(item.score.is_finite() && scale.contains(item.score)) {
                return Err(ValidationError::ScoreOutOfRange {
                    allocation_id: allocation.allocation_id,
                    criterion_id: item.criterion_id,
                    score: item.score,
                    min: scale.min,
                    max: scale.max,
                });
            }
        }
    }

    Ok(())
}

fn check_allocation(
    allocation: &Allocation,
    students: &HashSet<UserId>,
    criteria: &HashMap<CriterionId, ScaleBounds>,
) -> Result<(), ValidationError> {
    if !students.contains(&allocation.reviewer_id) {
        return Err(ValidationError::UnknownStudent {
            field: "allocations.reviewer_id",
            user_id: allocation.reviewer_id,
        });
    }
    if !students.contains(&allocation.reviewee_id) {
        return Err(ValidationError::UnknownStudent {
            field: "allocations.reviewee_id",
            user_id: allocation.reviewee_id,
        });
    }
    if allocation.is_self != (allocation.reviewer_id == allocation.reviewee_id) {
        return Err(ValidationError::SelfAllocationMismatch {
            allocation_id: allocation.allocation_id,
        });
    }
    if let Some(unknown) = allocation
        .criterion_ids
        .iter()
        .find(|id| !criteria.contains_key(id))
    {
        return Err(ValidationError::UnknownCriterion {
            allocation_id: allocation.allocation_id,
            criterion_id: *unknown,
        });
    }
    Ok(())
}
