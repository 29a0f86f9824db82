//! Response projections for the dashboard, flags and grade preview views.
//!
//! Every projection reads an [`EvaluationResult`]; nothing is recomputed.
//! This is the presentation boundary, so rounding happens here: averages,
//! SPR and GCF to two decimals, suggested grades to one.

use serde::{Deserialize, Serialize};

use crate::domain::{CriterionId, EvaluationId, RubricId, TeamId, UserId};
use crate::flags::Flag;
use crate::indices::round_to;
use crate::pipeline::{EvaluationResult, StudentResult};

const AVG_DECIMALS: u32 = 2;
const GRADE_DECIMALS: u32 = 1;

fn avg(value: f64) -> f64 {
    round_to(value, AVG_DECIMALS)
}

fn grade(value: Option<f64>) -> Option<f64> {
    value.map(|v| round_to(v, GRADE_DECIMALS))
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionSummary {
    pub id: CriterionId,
    pub name: String,
    pub weight: f64,
    pub scale_min: f64,
    pub scale_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRow {
    pub user_id: UserId,
    pub user_name: String,
    pub peer_avg_overall: f64,
    pub self_avg_overall: Option<f64>,
    pub reviewers_count: usize,
    pub gcf: f64,
    pub spr: f64,
    pub suggested_grade: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub evaluation_id: EvaluationId,
    pub rubric_id: RubricId,
    pub rubric_scale_min: f64,
    pub rubric_scale_max: f64,
    pub criteria: Vec<CriterionSummary>,
    pub items: Vec<DashboardRow>,
}

impl From<&StudentResult> for DashboardRow {
    fn from(r: &StudentResult) -> Self {
        Self {
            user_id: r.student.user_id,
            user_name: r.student.user_name.clone(),
            peer_avg_overall: avg(r.aggregate.peer_avg_overall),
            self_avg_overall: r.aggregate.self_avg_overall.map(avg),
            reviewers_count: r.aggregate.reviewers_count,
            gcf: avg(r.indices.gcf),
            spr: avg(r.indices.spr),
            suggested_grade: grade(r.indices.suggested_grade),
        }
    }
}

pub fn dashboard(result: &EvaluationResult) -> DashboardResponse {
    DashboardResponse {
        evaluation_id: result.evaluation_id,
        rubric_id: result.rubric.rubric_id,
        rubric_scale_min: result.rubric.scale_min,
        rubric_scale_max: result.rubric.scale_max,
        criteria: result
            .rubric
            .criteria
            .iter()
            .map(|c| CriterionSummary {
                id: c.id,
                name: c.name.clone(),
                weight: c.weight,
                scale_min: c.scale_min,
                scale_max: c.scale_max,
            })
            .collect(),
        items: result.results.iter().map(DashboardRow::from).collect(),
    }
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagsRow {
    pub user_id: UserId,
    pub user_name: String,
    pub spr: f64,
    pub gcf: f64,
    pub reviewers_count: usize,
    pub flags: Vec<Flag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagsResponse {
    pub evaluation_id: EvaluationId,
    pub items: Vec<FlagsRow>,
}

/// Students with at least one flag, in result order.
pub fn flags(result: &EvaluationResult) -> FlagsResponse {
    FlagsResponse {
        evaluation_id: result.evaluation_id,
        items: result
            .results
            .iter()
            .filter(|r| !r.flags.is_empty())
            .map(|r| FlagsRow {
                user_id: r.student.user_id,
                user_name: r.student.user_name.clone(),
                spr: avg(r.indices.spr),
                gcf: avg(r.indices.gcf),
                reviewers_count: r.aggregate.reviewers_count,
                flags: r.flags.clone(),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Grade preview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradePreviewItem {
    pub user_id: UserId,
    pub user_name: String,
    pub team_id: TeamId,
    pub group_grade: Option<f64>,
    pub avg_score: f64,
    pub gcf: f64,
    pub spr: f64,
    pub suggested_grade: Option<f64>,
    pub reviewers_count: usize,
    pub flag_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradePreviewResponse {
    pub evaluation_id: EvaluationId,
    pub items: Vec<GradePreviewItem>,
}

pub fn grade_preview(result: &EvaluationResult) -> GradePreviewResponse {
    GradePreviewResponse {
        evaluation_id: result.evaluation_id,
        items: result
            .results
            .iter()
            .map(|r| GradePreviewItem {
                user_id: r.student.user_id,
                user_name: r.student.user_name.clone(),
                team_id: r.student.team_id,
                group_grade: r.group_grade,
                avg_score: avg(r.aggregate.peer_avg_overall),
                gcf: avg(r.indices.gcf),
                spr: avg(r.indices.spr),
                suggested_grade: grade(r.indices.suggested_grade),
                reviewers_count: r.aggregate.reviewers_count,
                flag_count: r.flags.len(),
            })
            .collect(),
    }
}
