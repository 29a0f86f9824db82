//! Score aggregation.
//!
//! Turns the completed allocations a student received into a
//! [`StudentAggregate`]: per-criterion means over distinct reviewers, then a
//! rubric-weighted mean across criteria with weights normalised by the sum
//! of the weights that actually received scores.
//!
//! Averages are never rounded here; rounding happens at the presentation
//! boundary in [`crate::report`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    Allocation, AllocationId, CriterionId, EvaluationSnapshot, Rubric, ScoreItem, Submission,
    UserId,
};

/// Per-criterion view of the scores a student received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionBreakdown {
    pub criterion_id: CriterionId,
    /// Mean of peer scores; `None` when no peer scored this criterion.
    pub peer_mean: Option<f64>,
    /// Number of peers that scored this criterion.
    pub peer_count: usize,
    /// The student's own score, if submitted.
    pub self_score: Option<f64>,
}

/// Aggregated scores for one student.
///
/// `peer_avg_overall` is `0.0` when nobody scored the student; check
/// [`StudentAggregate::has_peer_data`] before trusting it.
/// `self_avg_overall` is `None` ("no data") when the self allocation is
/// absent, incomplete or empty, and is never conflated with a score of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentAggregate {
    pub user_id: UserId,
    pub peer_avg_overall: f64,
    pub self_avg_overall: Option<f64>,
    /// Completed peer allocations targeting this student.
    pub reviewers_count: usize,
    /// Completed peer allocations that scored at least one rubric criterion.
    /// A completed review with no items counts as a reviewer but not here.
    pub scored_reviewers_count: usize,
    pub per_criterion_breakdown: Vec<CriterionBreakdown>,
}

impl StudentAggregate {
    /// Whether `peer_avg_overall` is backed by at least one peer score.
    pub fn has_peer_data(&self) -> bool {
        self.scored_reviewers_count > 0
    }
}

/// An allocation paired with the items submitted for it.
#[derive(Debug, Clone, Copy)]
pub struct ScoredAllocation<'a> {
    pub allocation: &'a Allocation,
    pub items: &'a [ScoreItem],
}

/// Lookup from allocation id to its submission.
#[derive(Debug, Default)]
pub struct SubmissionIndex<'a> {
    by_allocation: HashMap<AllocationId, &'a Submission>,
}

impl<'a> SubmissionIndex<'a> {
    pub fn build(snapshot: &'a EvaluationSnapshot) -> Self {
        let by_allocation = snapshot
            .submissions
            .iter()
            .map(|s| (s.allocation_id, s))
            .collect();
        Self { by_allocation }
    }

    pub fn items(&self, allocation_id: AllocationId) -> &'a [ScoreItem] {
        self.by_allocation
            .get(&allocation_id)
            .map(|s| s.items.as_slice())
            .unwrap_or(&[])
    }
}

/// Completed allocations whose reviewee is `student_id`, joined with their
/// submitted items and ordered by reviewer id so summation order is fixed.
pub fn completed_allocations_for<'a>(
    snapshot: &'a EvaluationSnapshot,
    index: &SubmissionIndex<'a>,
    student_id: UserId,
) -> Vec<ScoredAllocation<'a>> {
    let mut scored: Vec<ScoredAllocation<'a>> = snapshot
        .allocations
        .iter()
        .filter(|a| a.completed && a.reviewee_id == student_id)
        .map(|allocation| ScoredAllocation {
            allocation,
            items: index.items(allocation.allocation_id),
        })
        .collect();
    scored.sort_by_key(|s| (s.allocation.reviewer_id, s.allocation.allocation_id));
    scored
}

/// Aggregate the scores `student_id` received.
///
/// Allocations that are not completed or target another student are
/// ignored. A completed allocation with no items still counts as a reviewer
/// but contributes no scores.
pub fn aggregate(
    student_id: UserId,
    allocations: &[ScoredAllocation<'_>],
    rubric: &Rubric,
) -> StudentAggregate {
    let relevant = allocations
        .iter()
        .filter(|s| s.allocation.completed && s.allocation.reviewee_id == student_id);

    let mut peers: Vec<&ScoredAllocation<'_>> = Vec::new();
    let mut own: Option<&ScoredAllocation<'_>> = None;
    for scored in relevant {
        if scored.allocation.is_self {
            own = Some(scored);
        } else {
            peers.push(scored);
        }
    }

    let per_criterion_breakdown: Vec<CriterionBreakdown> = rubric
        .criteria
        .iter()
        .map(|criterion| {
            let peer_scores: Vec<f64> = peers
                .iter()
                .filter_map(|s| score_for(s.items, criterion.id))
                .collect();
            CriterionBreakdown {
                criterion_id: criterion.id,
                peer_mean: mean(&peer_scores),
                peer_count: peer_scores.len(),
                self_score: own.and_then(|s| score_for(s.items, criterion.id)),
            }
        })
        .collect();

    let peer_avg_overall = weighted_mean(
        rubric,
        per_criterion_breakdown
            .iter()
            .map(|b| (b.criterion_id, b.peer_mean)),
    )
    .unwrap_or(0.0);

    let scored_reviewers_count = peers
        .iter()
        .filter(|s| {
            rubric
                .criteria
                .iter()
                .any(|c| score_for(s.items, c.id).is_some())
        })
        .count();

    let self_avg_overall = weighted_mean(
        rubric,
        per_criterion_breakdown
            .iter()
            .map(|b| (b.criterion_id, b.self_score)),
    );

    StudentAggregate {
        user_id: student_id,
        peer_avg_overall,
        self_avg_overall,
        reviewers_count: peers.len(),
        scored_reviewers_count,
        per_criterion_breakdown,
    }
}

fn score_for(items: &[ScoreItem], criterion_id: CriterionId) -> Option<f64> {
    items
        .iter()
        .find(|i| i.criterion_id == criterion_id)
        .map(|i| i.score)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// `Σ(mean_i · w_i) / Σ(w_i)` over criteria that have a mean. Unscored
/// criteria drop out of both sums. `None` when nothing was scored.
fn weighted_mean(
    rubric: &Rubric,
    means: impl Iterator<Item = (CriterionId, Option<f64>)>,
) -> Option<f64> {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (criterion_id, value) in means {
        let (Some(value), Some(criterion)) = (value, rubric.criterion(criterion_id)) else {
            continue;
        };
        numerator += value * criterion.weight;
        denominator += criterion.weight;
    }
    if denominator > 0.0 {
        Some(numerator / denominator)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Criterion;

    fn rubric() -> Rubric {
        Rubric {
            rubric_id: 1,
            scale_min: 1.0,
            scale_max: 5.0,
            criteria: vec![
                Criterion {
                    id: 1,
                    name: "A".to_string(),
                    weight: 2.0,
                    scale_min: 1.0,
                    scale_max: 5.0,
                },
                Criterion {
                    id: 2,
                    name: "B".to_string(),
                    weight: 1.0,
                    scale_min: 1.0,
                    scale_max: 5.0,
                },
            ],
        }
    }

    fn allocation(id: i64, reviewer: i64, reviewee: i64, completed: bool) -> Allocation {
        Allocation {
            allocation_id: id,
            reviewer_id: reviewer,
            reviewee_id: reviewee,
            is_self: reviewer == reviewee,
            criterion_ids: vec![1, 2],
            completed,
        }
    }

    fn items(a: Option<f64>, b: Option<f64>) -> Vec<ScoreItem> {
        [(1, a), (2, b)]
            .into_iter()
            .filter_map(|(criterion_id, score)| {
                score.map(|score| ScoreItem {
                    criterion_id,
                    score,
                    comment: None,
                })
            })
            .collect()
    }

    #[test]
    fn weighted_peer_average_matches_worked_example() {
        let allocs = [
            allocation(1, 2, 1, true),
            allocation(2, 3, 1, true),
            allocation(3, 4, 1, true),
        ];
        let scores = [
            items(Some(4.0), Some(2.0)),
            items(Some(5.0), Some(3.0)),
            items(Some(3.0), Some(4.0)),
        ];
        let scored: Vec<ScoredAllocation<'_>> = allocs
            .iter()
            .zip(scores.iter())
            .map(|(allocation, items)| ScoredAllocation { allocation, items })
            .collect();

        let agg = aggregate(1, &scored, &rubric());

        assert_eq!(agg.reviewers_count, 3);
        assert_eq!(agg.scored_reviewers_count, 3);
        assert_eq!(agg.per_criterion_breakdown[0].peer_mean, Some(4.0));
        assert_eq!(agg.per_criterion_breakdown[1].peer_mean, Some(3.0));
        assert!((agg.peer_avg_overall - 11.0 / 3.0).abs() < 1e-12);
        assert_eq!(agg.self_avg_overall, None);
    }

    #[test]
    fn no_reviewers_reports_zero_not_nan() {
        let agg = aggregate(1, &[], &rubric());
        assert_eq!(agg.reviewers_count, 0);
        assert_eq!(agg.peer_avg_overall, 0.0);
        assert!(agg.peer_avg_overall.is_finite());
        assert!(!agg.has_peer_data());
    }

    #[test]
    fn incomplete_allocations_are_ignored() {
        let done = allocation(1, 2, 1, true);
        let pending = allocation(2, 3, 1, false);
        let s1 = items(Some(4.0), Some(4.0));
        let s2 = items(Some(1.0), Some(1.0));
        let scored = [
            ScoredAllocation {
                allocation: &done,
                items: &s1,
            },
            ScoredAllocation {
                allocation: &pending,
                items: &s2,
            },
        ];
        let agg = aggregate(1, &scored, &rubric());
        assert_eq!(agg.reviewers_count, 1);
        assert_eq!(agg.peer_avg_overall, 4.0);
    }

    #[test]
    fn unscored_criterion_drops_out_of_denominator() {
        let a = allocation(1, 2, 1, true);
        let s = items(None, Some(2.0));
        let scored = [ScoredAllocation {
            allocation: &a,
            items: &s,
        }];
        let agg = aggregate(1, &scored, &rubric());
        // Only B (weight 1) scored: 2.0 * 1 / 1, not (0*2 + 2*1) / 3.
        assert_eq!(agg.peer_avg_overall, 2.0);
        assert_eq!(agg.per_criterion_breakdown[0].peer_mean, None);
        assert_eq!(agg.per_criterion_breakdown[0].peer_count, 0);
    }

    #[test]
    fn completed_allocation_without_items_counts_but_adds_nothing() {
        let a = allocation(1, 2, 1, true);
        let scored = [ScoredAllocation {
            allocation: &a,
            items: &[],
        }];
        let agg = aggregate(1, &scored, &rubric());
        assert_eq!(agg.reviewers_count, 1);
        assert_eq!(agg.scored_reviewers_count, 0);
        assert_eq!(agg.peer_avg_overall, 0.0);
        assert!(!agg.has_peer_data());
    }

    #[test]
    fn empty_review_does_not_dilute_scored_ones() {
        let a = allocation(1, 2, 1, true);
        let b = allocation(2, 3, 1, true);
        let s = items(Some(4.0), Some(1.0));
        let scored = [
            ScoredAllocation {
                allocation: &a,
                items: &s,
            },
            ScoredAllocation {
                allocation: &b,
                items: &[],
            },
        ];
        let agg = aggregate(1, &scored, &rubric());
        assert_eq!(agg.reviewers_count, 2);
        assert_eq!(agg.scored_reviewers_count, 1);
        assert!(agg.has_peer_data());
        assert_eq!(agg.peer_avg_overall, 3.0);
    }

    #[test]
    fn self_average_uses_same_weighting() {
        let own = allocation(1, 1, 1, true);
        let s = items(Some(5.0), Some(2.0));
        let scored = [ScoredAllocation {
            allocation: &own,
            items: &s,
        }];
        let agg = aggregate(1, &scored, &rubric());
        assert_eq!(agg.reviewers_count, 0);
        assert_eq!(agg.self_avg_overall, Some(4.0));
        assert_eq!(agg.per_criterion_breakdown[0].self_score, Some(5.0));
    }

    #[test]
    fn incomplete_self_allocation_is_no_data() {
        let own = allocation(1, 1, 1, false);
        let s = items(Some(5.0), Some(5.0));
        let scored = [ScoredAllocation {
            allocation: &own,
            items: &s,
        }];
        assert_eq!(aggregate(1, &scored, &rubric()).self_avg_overall, None);
    }

    #[test]
    fn allocations_for_other_students_are_ignored() {
        let other = allocation(1, 2, 3, true);
        let s = items(Some(1.0), Some(1.0));
        let scored = [ScoredAllocation {
            allocation: &other,
            items: &s,
        }];
        assert_eq!(aggregate(1, &scored, &rubric()).reviewers_count, 0);
    }
}
