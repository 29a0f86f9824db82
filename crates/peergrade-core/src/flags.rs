//! Flag rules engine.
//!
//! Evaluates a student's [`StudentAggregate`] and [`ContributionIndices`]
//! against [`FlagThresholds`] and returns every triggered [`Flag`]. Rules are
//! independent; none short-circuits another. Output is ordered by
//! descending severity, then by rule code.

use serde::{Deserialize, Serialize};

use crate::aggregate::StudentAggregate;
use crate::indices::ContributionIndices;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Tunable sensitivity for the flag rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagThresholds {
    /// Fewer completed peer reviews than this raises `low_reviewer_coverage`.
    pub minimum_required_reviewers: usize,
    /// SPR strictly above this raises `self_overrating`.
    pub self_overrating_threshold: f64,
    /// SPR strictly below this raises `self_underrating`.
    pub self_underrating_threshold: f64,
    /// GCF strictly below this raises `low_gcf`.
    pub low_gcf_threshold: f64,
    /// GCF strictly above this raises `high_gcf`.
    pub high_gcf_threshold: f64,
    /// Raise `missing_self_assessment` when no self score exists.
    pub flag_missing_self_assessment: bool,
}

impl Default for FlagThresholds {
    fn default() -> Self {
        Self {
            minimum_required_reviewers: 2,
            self_overrating_threshold: 1.3,
            self_underrating_threshold: 0.7,
            low_gcf_threshold: 0.8,
            high_gcf_threshold: 1.2,
            flag_missing_self_assessment: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Severity of a flag. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// A flag rule. Serialized as its snake_case code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagRule {
    LowReviewerCoverage,
    SelfOverrating,
    SelfUnderrating,
    LowGcf,
    HighGcf,
    MissingSelfAssessment,
}

impl FlagRule {
    pub const ALL: [FlagRule; 6] = [
        FlagRule::LowReviewerCoverage,
        FlagRule::SelfOverrating,
        FlagRule::SelfUnderrating,
        FlagRule::LowGcf,
        FlagRule::HighGcf,
        FlagRule::MissingSelfAssessment,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            FlagRule::LowReviewerCoverage => "low_reviewer_coverage",
            FlagRule::SelfOverrating => "self_overrating",
            FlagRule::SelfUnderrating => "self_underrating",
            FlagRule::LowGcf => "low_gcf",
            FlagRule::HighGcf => "high_gcf",
            FlagRule::MissingSelfAssessment => "missing_self_assessment",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            FlagRule::LowReviewerCoverage => Severity::High,
            FlagRule::SelfOverrating | FlagRule::LowGcf => Severity::Medium,
            FlagRule::SelfUnderrating | FlagRule::HighGcf | FlagRule::MissingSelfAssessment => {
                Severity::Low
            }
        }
    }
}

/// A triggered rule attached to a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    pub code: FlagRule,
    pub severity: Severity,
    /// Human-readable explanation.
    pub message: String,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Evaluate every rule and return all triggered flags, highest severity
/// first, ties broken by rule code.
pub fn evaluate_flags(
    aggregate: &StudentAggregate,
    indices: &ContributionIndices,
    thresholds: &FlagThresholds,
) -> Vec<Flag> {
    let mut flags: Vec<Flag> = FlagRule::ALL
        .iter()
        .filter_map(|rule| check_rule(*rule, aggregate, indices, thresholds))
        .collect();

    flags.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.code.code().cmp(b.code.code()))
    });
    flags
}

fn flag(rule: FlagRule, message: String) -> Option<Flag> {
    Some(Flag {
        code: rule,
        severity: rule.severity(),
        message,
    })
}

fn check_rule(
    rule: FlagRule,
    aggregate: &StudentAggregate,
    indices: &ContributionIndices,
    thresholds: &FlagThresholds,
) -> Option<Flag> {
    match rule {
        FlagRule::LowReviewerCoverage => {
            if aggregate.reviewers_count < thresholds.minimum_required_reviewers {
                flag(
                    rule,
                    format!(
                        "{} peer review(s) completed, {} required",
                        aggregate.reviewers_count, thresholds.minimum_required_reviewers,
                    ),
                )
            } else {
                None
            }
        }
        FlagRule::SelfOverrating => {
            if indices.spr > thresholds.self_overrating_threshold {
                flag(
                    rule,
                    format!(
                        "self/peer ratio {:.2} above {:.2}",
                        indices.spr, thresholds.self_overrating_threshold,
                    ),
                )
            } else {
                None
            }
        }
        FlagRule::SelfUnderrating => {
            if indices.spr < thresholds.self_underrating_threshold {
                flag(
                    rule,
                    format!(
                        "self/peer ratio {:.2} below {:.2}",
                        indices.spr, thresholds.self_underrating_threshold,
                    ),
                )
            } else {
                None
            }
        }
        FlagRule::LowGcf => {
            if indices.gcf < thresholds.low_gcf_threshold {
                flag(
                    rule,
                    format!(
                        "group correction factor {:.2} below {:.2}",
                        indices.gcf, thresholds.low_gcf_threshold,
                    ),
                )
            } else {
                None
            }
        }
        FlagRule::HighGcf => {
            if indices.gcf > thresholds.high_gcf_threshold {
                flag(
                    rule,
                    format!(
                        "group correction factor {:.2} above {:.2}",
                        indices.gcf, thresholds.high_gcf_threshold,
                    ),
                )
            } else {
                None
            }
        }
        FlagRule::MissingSelfAssessment => {
            if thresholds.flag_missing_self_assessment && aggregate.self_avg_overall.is_none() {
                flag(rule, "no completed self assessment".to_string())
            } else {
                None
            }
        }
    }
}
