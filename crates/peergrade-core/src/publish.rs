//! Grade Publisher.
//!
//! Merges teacher overrides with computed suggestions and commits the final
//! grade list for an evaluation. Every student is checked before anything is
//! written: all issues are collected and returned together, and the batch is
//! committed through [`GradeLedger::replace_grades`] only when the list is
//! clean. Republishing the same request produces the same grade set.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::GradingConfig;
use crate::domain::{EvaluationId, GradeRecord, PeerGradeError, Result, ScaleBounds, UserId};
use crate::indices::round_to;
use crate::metrics::METRICS;
use crate::obs;
use crate::pipeline::EvaluationResult;
use peergrade_state::GradeLedger;

// ---------------------------------------------------------------------------
// Policy and request
// ---------------------------------------------------------------------------

/// When an override must carry a reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishPolicy {
    pub require_override_reason: bool,
    /// An override further than this from the (rounded) suggestion needs a
    /// reason.
    pub reason_required_delta: f64,
}

impl Default for PublishPolicy {
    fn default() -> Self {
        Self {
            require_override_reason: true,
            reason_required_delta: 1.0,
        }
    }
}

/// A teacher's adjustment for one student. Both fields are optional; a
/// reason without a grade is kept as an annotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeOverride {
    #[serde(default)]
    pub grade: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl GradeOverride {
    pub fn grade(grade: f64) -> Self {
        Self {
            grade: Some(grade),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Trimmed reason, `None` when absent or blank.
    fn reason_text(&self) -> Option<String> {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub evaluation_id: EvaluationId,
    #[serde(default)]
    pub overrides: BTreeMap<UserId, GradeOverride>,
}

impl PublishRequest {
    pub fn new(evaluation_id: EvaluationId) -> Self {
        Self {
            evaluation_id,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, user_id: UserId, grade_override: GradeOverride) -> Self {
        self.overrides.insert(user_id, grade_override);
        self
    }
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// One reason a publish request cannot be committed.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum PublishIssue {
    #[error("request targets evaluation {actual}, computed evaluation is {expected}")]
    EvaluationMismatch {
        expected: EvaluationId,
        actual: EvaluationId,
    },

    #[error("overrides[{user_id}]: student is not part of the evaluation")]
    UnknownStudent { user_id: UserId },

    #[error("overrides[{user_id}].grade: not a finite number")]
    NonFiniteGrade { user_id: UserId },

    #[error("overrides[{user_id}].grade: {grade} outside [{min}, {max}]")]
    GradeOutOfRange {
        user_id: UserId,
        grade: f64,
        min: f64,
        max: f64,
    },

    #[error(
        "overrides[{user_id}].reason: required when overriding {suggested} with {grade} (delta > {delta})"
    )]
    MissingReason {
        user_id: UserId,
        grade: f64,
        suggested: f64,
        delta: f64,
    },

    #[error("students[{user_id}]: no suggested grade and no override")]
    NoFinalGrade { user_id: UserId },
}

impl PublishIssue {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::EvaluationMismatch { .. } => None,
            Self::UnknownStudent { user_id }
            | Self::NonFiniteGrade { user_id }
            | Self::GradeOutOfRange { user_id, .. }
            | Self::MissingReason { user_id, .. }
            | Self::NoFinalGrade { user_id } => Some(*user_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Build the grade list for `request`, or every issue that blocks it.
///
/// Records are ordered by `user_id`, the order the ledger returns them in.
pub fn plan_publication(
    result: &EvaluationResult,
    request: &PublishRequest,
    policy: &PublishPolicy,
    grade_scale: &ScaleBounds,
) -> std::result::Result<Vec<GradeRecord>, Vec<PublishIssue>> {
    let mut issues = Vec::new();

    if request.evaluation_id != result.evaluation_id {
        issues.push(PublishIssue::EvaluationMismatch {
            expected: result.evaluation_id,
            actual: request.evaluation_id,
        });
    }

    let known: BTreeSet<UserId> = result.results.iter().map(|r| r.student.user_id).collect();
    for user_id in request.overrides.keys() {
        if !known.contains(user_id) {
            issues.push(PublishIssue::UnknownStudent { user_id: *user_id });
        }
    }

    let mut records = Vec::with_capacity(result.results.len());
    for student_result in &result.results {
        let user_id = student_result.student.user_id;
        let suggested = student_result
            .indices
            .suggested_grade
            .map(|g| round_to(g, 1));
        let grade_override = request.overrides.get(&user_id);
        let override_grade = grade_override.and_then(|o| o.grade);
        let reason = grade_override.and_then(GradeOverride::reason_text);

        if let Some(grade) = override_grade {
            if !grade.is_finite() {
                issues.push(PublishIssue::NonFiniteGrade { user_id });
                continue;
            }
            if !grade_scale.contains(grade) {
                issues.push(PublishIssue::GradeOutOfRange {
                    user_id,
                    grade,
                    min: grade_scale.min,
                    max: grade_scale.max,
                });
                continue;
            }
            if let Some(suggested) = suggested {
                if policy.require_override_reason
                    && (grade - suggested).abs() > policy.reason_required_delta
                    && reason.is_none()
                {
                    issues.push(PublishIssue::MissingReason {
                        user_id,
                        grade,
                        suggested,
                        delta: policy.reason_required_delta,
                    });
                    continue;
                }
            }
        }

        let Some(final_grade) = override_grade.or(suggested) else {
            issues.push(PublishIssue::NoFinalGrade { user_id });
            continue;
        };

        records.push(GradeRecord {
            evaluation_id: result.evaluation_id,
            user_id,
            user_name: student_result.student.user_name.clone(),
            suggested_grade: suggested,
            final_grade,
            overridden: override_grade.is_some(),
            reason,
        });
    }

    if !issues.is_empty() {
        return Err(issues);
    }
    records.sort_by_key(|r| r.user_id);
    Ok(records)
}

/// SHA-256 over the canonical JSON of `grades`, hex-encoded.
pub fn batch_digest(grades: &[GradeRecord]) -> Result<String> {
    let bytes = serde_json::to_vec(grades)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// What a successful publish committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub evaluation_id: EvaluationId,
    pub grades: Vec<GradeRecord>,
    pub batch_digest: String,
    pub published_at: DateTime<Utc>,
}

/// Commits grade batches to a [`GradeLedger`].
pub struct GradePublisher<L> {
    ledger: L,
    config: GradingConfig,
}

impl<L: GradeLedger> GradePublisher<L> {
    pub fn new(ledger: L, config: GradingConfig) -> Self {
        Self { ledger, config }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// The grade list `publish` would commit, without writing anything.
    pub fn preview(
        &self,
        result: &EvaluationResult,
        request: &PublishRequest,
    ) -> Result<Vec<GradeRecord>> {
        plan_publication(
            result,
            request,
            &self.config.publish,
            &self.config.grade_scale,
        )
        .map_err(|issues| PeerGradeError::PublishRejected {
            evaluation_id: request.evaluation_id,
            issues,
        })
    }

    /// Validate every student, then replace the evaluation's grade set in
    /// one atomic write. Nothing is written when any issue is found or the
    /// ledger write fails.
    pub async fn publish(
        &self,
        result: &EvaluationResult,
        request: &PublishRequest,
    ) -> Result<PublishReceipt> {
        let grades = match self.preview(result, request) {
            Ok(grades) => grades,
            Err(err) => {
                if let PeerGradeError::PublishRejected { issues, .. } = &err {
                    obs::emit_publish_rejected(request.evaluation_id, issues.len());
                }
                METRICS.inc_batches_rejected();
                return Err(err);
            }
        };

        let digest = batch_digest(&grades)?;
        self.ledger
            .replace_grades(result.evaluation_id, &grades)
            .await?;

        METRICS.inc_batches_published();
        let overridden = grades.iter().filter(|g| g.overridden).count();
        obs::emit_grades_published(result.evaluation_id, grades.len(), overridden, &digest);

        Ok(PublishReceipt {
            evaluation_id: result.evaluation_id,
            grades,
            batch_digest: digest,
            published_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::StudentAggregate;
    use crate::domain::{Rubric, Student};
    use crate::indices::ContributionIndices;
    use crate::pipeline::StudentResult;

    const GRADES: ScaleBounds = ScaleBounds::new(1.0, 10.0);

    fn student(user_id: UserId, name: &str, suggested: Option<f64>) -> StudentResult {
        StudentResult {
            student: Student {
                user_id,
                user_name: name.to_string(),
                team_id: 1,
            },
            group_grade: suggested.map(|_| 8.0),
            aggregate: StudentAggregate {
                user_id,
                peer_avg_overall: 3.0,
                self_avg_overall: None,
                reviewers_count: 2,
                scored_reviewers_count: 2,
                per_criterion_breakdown: Vec::new(),
            },
            indices: ContributionIndices {
                user_id,
                spr: 1.0,
                gcf: 1.0,
                suggested_grade: suggested,
            },
            flags: Vec::new(),
        }
    }

    fn result(students: Vec<StudentResult>) -> EvaluationResult {
        EvaluationResult {
            evaluation_id: 1,
            rubric: Rubric {
                rubric_id: 1,
                scale_min: 1.0,
                scale_max: 5.0,
                criteria: Vec::new(),
            },
            results: students,
            team_means: BTreeMap::new(),
        }
    }

    fn plan(
        result: &EvaluationResult,
        request: &PublishRequest,
    ) -> std::result::Result<Vec<GradeRecord>, Vec<PublishIssue>> {
        plan_publication(result, request, &PublishPolicy::default(), &GRADES)
    }

    #[test]
    fn suggestions_become_final_grades() {
        let r = result(vec![
            student(2, "bea", Some(7.26)),
            student(1, "ana", Some(9.6)),
        ]);
        let grades = plan(&r, &PublishRequest::new(1)).unwrap();
        assert_eq!(grades.len(), 2);
        assert_eq!(grades[0].user_id, 1);
        assert_eq!(grades[0].final_grade, 9.6);
        assert_eq!(grades[1].final_grade, 7.3);
        assert!(grades.iter().all(|g| !g.overridden));
    }

    #[test]
    fn small_override_needs_no_reason() {
        let r = result(vec![student(1, "ana", Some(8.0))]);
        let req = PublishRequest::new(1).with_override(1, GradeOverride::grade(8.5));
        let grades = plan(&r, &req).unwrap();
        assert_eq!(grades[0].final_grade, 8.5);
        assert_eq!(grades[0].suggested_grade, Some(8.0));
        assert!(grades[0].overridden);
        assert_eq!(grades[0].reason, None);
    }

    #[test]
    fn large_override_without_reason_is_rejected() {
        let r = result(vec![student(1, "ana", Some(8.0))]);
        let req = PublishRequest::new(1).with_override(1, GradeOverride::grade(5.0));
        let issues = plan(&r, &req).unwrap_err();
        assert_eq!(
            issues,
            vec![PublishIssue::MissingReason {
                user_id: 1,
                grade: 5.0,
                suggested: 8.0,
                delta: 1.0,
            }]
        );
    }

    #[test]
    fn blank_reason_counts_as_missing() {
        let r = result(vec![student(1, "ana", Some(8.0))]);
        let req =
            PublishRequest::new(1).with_override(1, GradeOverride::grade(5.0).with_reason("   "));
        assert!(plan(&r, &req).is_err());
    }

    #[test]
    fn reason_policy_can_be_disabled() {
        let r = result(vec![student(1, "ana", Some(8.0))]);
        let req = PublishRequest::new(1).with_override(1, GradeOverride::grade(5.0));
        let lax = PublishPolicy {
            require_override_reason: false,
            ..PublishPolicy::default()
        };
        let grades = plan_publication(&r, &req, &lax, &GRADES).unwrap();
        assert_eq!(grades[0].final_grade, 5.0);
    }

    #[test]
    fn every_issue_is_reported() {
        let r = result(vec![
            student(1, "ana", Some(8.0)),
            student(2, "bea", None),
            student(3, "cid", Some(6.0)),
            student(4, "dan", Some(6.0)),
        ]);
        let req = PublishRequest::new(1)
            .with_override(1, GradeOverride::grade(11.0))
            .with_override(3, GradeOverride::grade(f64::NAN))
            .with_override(4, GradeOverride::grade(2.0))
            .with_override(99, GradeOverride::grade(5.0));
        let issues = plan(&r, &req).unwrap_err();
        let users: BTreeSet<Option<UserId>> = issues.iter().map(|i| i.user_id()).collect();
        assert_eq!(issues.len(), 5);
        assert_eq!(
            users,
            [Some(1), Some(2), Some(3), Some(4), Some(99)]
                .into_iter()
                .collect()
        );
        assert!(issues.contains(&PublishIssue::NoFinalGrade { user_id: 2 }));
        assert!(issues.contains(&PublishIssue::UnknownStudent { user_id: 99 }));
    }

    #[test]
    fn override_supplies_grade_when_no_suggestion() {
        let r = result(vec![student(1, "ana", None)]);
        let req = PublishRequest::new(1).with_override(1, GradeOverride::grade(4.0));
        let grades = plan(&r, &req).unwrap();
        assert_eq!(grades[0].final_grade, 4.0);
        assert_eq!(grades[0].suggested_grade, None);
    }

    #[test]
    fn mismatched_evaluation_is_rejected() {
        let r = result(vec![student(1, "ana", Some(8.0))]);
        let issues = plan(&r, &PublishRequest::new(2)).unwrap_err();
        assert_eq!(
            issues,
            vec![PublishIssue::EvaluationMismatch {
                expected: 1,
                actual: 2
            }]
        );
    }

    #[test]
    fn digest_is_stable_and_content_sensitive() {
        let r = result(vec![student(1, "ana", Some(8.0))]);
        let a = plan(&r, &PublishRequest::new(1)).unwrap();
        let mut b = a.clone();
        assert_eq!(batch_digest(&a).unwrap(), batch_digest(&b).unwrap());
        assert_eq!(batch_digest(&a).unwrap().len(), 64);
        b[0].final_grade = 7.0;
        assert_ne!(batch_digest(&a).unwrap(), batch_digest(&b).unwrap());
    }

    #[test]
    fn issue_serializes_with_tag() {
        let json = serde_json::to_value(PublishIssue::NoFinalGrade { user_id: 4 }).unwrap();
        assert_eq!(json["issue"], "no_final_grade");
        assert_eq!(json["user_id"], 4);
    }

    #[test]
    fn request_parses_string_keyed_overrides() {
        let req: PublishRequest = serde_json::from_str(
            r#"{"evaluation_id": 1, "overrides": {"7": {"grade": 6.5, "reason": "late"}}}"#,
        )
        .unwrap();
        assert_eq!(req.overrides[&7].grade, Some(6.5));
        assert_eq!(req.overrides[&7].reason.as_deref(), Some("late"));
    }
}
