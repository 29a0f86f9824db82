//! Contribution indices: self/peer ratio (SPR), group correction factor
//! (GCF) and the suggested individual grade.
//!
//! All functions are pure and total over valid input. Invalid input
//! (negative, non-finite, or outside the grade scale) is rejected with a
//! [`ValidationError`] instead of being extrapolated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::StudentAggregate;
use crate::domain::{ScaleBounds, TeamId, UserId, ValidationError};

/// Neutral ratio used when there is no data to compare.
pub const NEUTRAL_RATIO: f64 = 1.0;

/// Clamp ranges for SPR and GCF.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatioBounds {
    pub spr_min: f64,
    /// Also the value used when a student rates themself above zero but no
    /// peer scored them.
    pub spr_max: f64,
    pub gcf_min: f64,
    pub gcf_max: f64,
}

impl Default for RatioBounds {
    fn default() -> Self {
        Self {
            spr_min: 0.0,
            spr_max: 2.0,
            gcf_min: 0.5,
            gcf_max: 1.5,
        }
    }
}

impl RatioBounds {
    pub fn spr(&self) -> ScaleBounds {
        ScaleBounds::new(self.spr_min, self.spr_max)
    }

    pub fn gcf(&self) -> ScaleBounds {
        ScaleBounds::new(self.gcf_min, self.gcf_max)
    }
}

/// Derived per-student indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionIndices {
    pub user_id: UserId,
    pub spr: f64,
    pub gcf: f64,
    /// Unrounded; `None` when the student's team has no group grade.
    pub suggested_grade: Option<f64>,
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::NonFiniteInput { field })
    }
}

/// Self/peer ratio.
///
/// - `self_avg / peer_avg` when `peer_avg > 0`
/// - neutral `1.0` when the self average is absent, or both are zero
/// - `spr_max` when peers gave nothing but the student rated themself above zero
///
/// The result is always clamped to `[spr_min, spr_max]`.
pub fn compute_spr(
    self_avg: Option<f64>,
    peer_avg: f64,
    bounds: &RatioBounds,
) -> Result<f64, ValidationError> {
    let peer_avg = non_negative("peer_avg", peer_avg)?;
    let self_avg = self_avg
        .map(|s| non_negative("self_avg", s))
        .transpose()?;

    let raw = match self_avg {
        None => NEUTRAL_RATIO,
        Some(s) if peer_avg > 0.0 => s / peer_avg,
        Some(s) if s > 0.0 => bounds.spr_max,
        Some(_) => NEUTRAL_RATIO,
    };
    Ok(bounds.spr().clamp(raw))
}

/// Group correction factor: student peer average over the team mean,
/// clamped to `[gcf_min, gcf_max]`. A non-positive team mean yields the
/// neutral factor.
pub fn compute_gcf(
    student_peer_avg: f64,
    team_peer_avg_mean: f64,
    bounds: &RatioBounds,
) -> Result<f64, ValidationError> {
    let student = non_negative("student_peer_avg", student_peer_avg)?;
    let team = non_negative("team_peer_avg_mean", team_peer_avg_mean)?;

    let raw = if team > 0.0 {
        student / team
    } else {
        NEUTRAL_RATIO
    };
    Ok(bounds.gcf().clamp(raw))
}

/// `clamp(group_grade · gcf, grade_scale)`, unrounded.
pub fn compute_suggested_grade(
    group_grade: f64,
    gcf: f64,
    grade_scale: &ScaleBounds,
) -> Result<f64, ValidationError> {
    if !(group_grade.is_finite() && grade_scale.contains(group_grade)) {
        return Err(ValidationError::InputOutOfRange {
            field: "group_grade",
            value: group_grade,
            min: grade_scale.min,
            max: grade_scale.max,
        });
    }
    let gcf = non_negative("gcf", gcf)?;
    Ok(grade_scale.clamp(group_grade * gcf))
}

/// Round half away from zero to `decimals` places. Presentation only.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Mean peer average per team, over members that received at least one peer
/// score. Teams with no rated members are absent from the map.
pub fn team_peer_means<'a>(
    members: impl IntoIterator<Item = (TeamId, &'a StudentAggregate)>,
) -> BTreeMap<TeamId, f64> {
    let mut sums: BTreeMap<TeamId, (f64, usize)> = BTreeMap::new();
    for (team_id, aggregate) in members {
        if !aggregate.has_peer_data() {
            continue;
        }
        let entry = sums.entry(team_id).or_insert((0.0, 0));
        entry.0 += aggregate.peer_avg_overall;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(team_id, (sum, n))| (team_id, sum / n as f64))
        .collect()
}

/// Indices for one student.
///
/// Students without peer scores get the neutral GCF: their zero peer
/// average is "no data", not evidence of low contribution. This includes
/// students whose only completed reviews carried no items.
pub fn compute_indices(
    aggregate: &StudentAggregate,
    team_mean: Option<f64>,
    group_grade: Option<f64>,
    bounds: &RatioBounds,
    grade_scale: &ScaleBounds,
) -> Result<ContributionIndices, ValidationError> {
    let spr = compute_spr(aggregate.self_avg_overall, aggregate.peer_avg_overall, bounds)?;

    let gcf = match team_mean {
        Some(mean) if aggregate.has_peer_data() => {
            compute_gcf(aggregate.peer_avg_overall, mean, bounds)?
        }
        _ => bounds.gcf().clamp(NEUTRAL_RATIO),
    };

    let suggested_grade = group_grade
        .map(|g| compute_suggested_grade(g, gcf, grade_scale))
        .transpose()?;

    Ok(ContributionIndices {
        user_id: aggregate.user_id,
        spr,
        gcf,
        suggested_grade,
    })
}
