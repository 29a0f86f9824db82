//! Shared cohort fixture for integration tests.
//!
//! Team Alpha (group grade 7.0):
//! - ana: reviewed by bea, cid, dan (A 4/5/3, B 2/3/4), no self assessment
//! - bea: reviewed by ana, cid (all 3s), self A 5 / B 3.5
//! - cid: no peer reviews, self A 4 / B 4
//! - dan: one pending (incomplete) review from ana
//!
//! Team Beta (group grade 8.0):
//! - erin: reviewed by finn (all 4.5)
//! - finn: reviewed by erin (all 3.0)
//!
//! Rubric: criterion A weight 2, criterion B weight 1, scale 1-5.

#![allow(dead_code)]

use peergrade_core::{
    Allocation, Criterion, EvaluationSnapshot, Rubric, ScoreItem, Student, Submission, Team,
};

pub const EVALUATION_ID: i64 = 42;

pub const ANA: i64 = 1;
pub const BEA: i64 = 2;
pub const CID: i64 = 3;
pub const DAN: i64 = 4;
pub const ERIN: i64 = 5;
pub const FINN: i64 = 6;

const A: i64 = 1;
const B: i64 = 2;

fn student(user_id: i64, name: &str, team_id: i64) -> Student {
    Student {
        user_id,
        user_name: name.to_string(),
        team_id,
    }
}

pub struct CohortBuilder {
    snapshot: EvaluationSnapshot,
    next_allocation: i64,
}

impl CohortBuilder {
    pub fn empty(weights: (f64, f64)) -> Self {
        Self {
            snapshot: EvaluationSnapshot {
                evaluation_id: EVALUATION_ID,
                rubric: Rubric {
                    rubric_id: 7,
                    scale_min: 1.0,
                    scale_max: 5.0,
                    criteria: vec![
                        Criterion {
                            id: A,
                            name: "Contribution".to_string(),
                            weight: weights.0,
                            scale_min: 1.0,
                            scale_max: 5.0,
                        },
                        Criterion {
                            id: B,
                            name: "Communication".to_string(),
                            weight: weights.1,
                            scale_min: 1.0,
                            scale_max: 5.0,
                        },
                    ],
                },
                students: Vec::new(),
                teams: Vec::new(),
                allocations: Vec::new(),
                submissions: Vec::new(),
            },
            next_allocation: 100,
        }
    }

    pub fn team(mut self, team_id: i64, name: &str, group_grade: Option<f64>) -> Self {
        self.snapshot.teams.push(Team {
            team_id,
            name: name.to_string(),
            group_grade,
        });
        self
    }

    pub fn student(mut self, user_id: i64, name: &str, team_id: i64) -> Self {
        self.snapshot.students.push(student(user_id, name, team_id));
        self
    }

    /// Completed review with scores for both criteria.
    pub fn review(mut self, reviewer: i64, reviewee: i64, a: f64, b: f64) -> Self {
        let allocation_id = self.allocate(reviewer, reviewee, true);
        self.snapshot.submissions.push(Submission {
            allocation_id,
            reviewer_id: reviewer,
            items: vec![
                ScoreItem {
                    criterion_id: A,
                    score: a,
                    comment: None,
                },
                ScoreItem {
                    criterion_id: B,
                    score: b,
                    comment: None,
                },
            ],
        });
        self
    }

    /// Completed review whose submission carries no score items.
    pub fn empty_review(mut self, reviewer: i64, reviewee: i64) -> Self {
        let allocation_id = self.allocate(reviewer, reviewee, true);
        self.snapshot.submissions.push(Submission {
            allocation_id,
            reviewer_id: reviewer,
            items: Vec::new(),
        });
        self
    }

    pub fn pending(mut self, reviewer: i64, reviewee: i64) -> Self {
        self.allocate(reviewer, reviewee, false);
        self
    }

    fn allocate(&mut self, reviewer: i64, reviewee: i64, completed: bool) -> i64 {
        let allocation_id = self.next_allocation;
        self.next_allocation += 1;
        self.snapshot.allocations.push(Allocation {
            allocation_id,
            reviewer_id: reviewer,
            reviewee_id: reviewee,
            is_self: reviewer == reviewee,
            criterion_ids: vec![A, B],
            completed,
        });
        allocation_id
    }

    pub fn build(self) -> EvaluationSnapshot {
        self.snapshot
    }
}

pub fn cohort_with_weights(weights: (f64, f64)) -> EvaluationSnapshot {
    CohortBuilder::empty(weights)
        .team(10, "Alpha", Some(7.0))
        .team(20, "Beta", Some(8.0))
        .student(ANA, "ana", 10)
        .student(BEA, "bea", 10)
        .student(CID, "cid", 10)
        .student(DAN, "dan", 10)
        .student(ERIN, "erin", 20)
        .student(FINN, "finn", 20)
        .review(BEA, ANA, 4.0, 2.0)
        .review(CID, ANA, 5.0, 3.0)
        .review(DAN, ANA, 3.0, 4.0)
        .review(ANA, BEA, 3.0, 3.0)
        .review(CID, BEA, 3.0, 3.0)
        .review(BEA, BEA, 5.0, 3.5)
        .review(CID, CID, 4.0, 4.0)
        .pending(ANA, DAN)
        .review(FINN, ERIN, 4.5, 4.5)
        .review(ERIN, FINN, 3.0, 3.0)
        .build()
}

pub fn cohort() -> EvaluationSnapshot {
    cohort_with_weights((2.0, 1.0))
}
