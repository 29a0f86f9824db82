//! peergrade-core: peer/self score aggregation and grade publishing
//!
//! Turns the committed allocations and scores of one evaluation into
//! per-student aggregates, contribution indices (SPR, GCF), a suggested
//! individual grade and review flags, then publishes final grades as one
//! atomic batch.
//!
//! ## Pipeline
//!
//! 1. [`validate_snapshot`] rejects bad input before anything is computed
//! 2. [`aggregate()`] per student, in parallel
//! 3. [`team_peer_means`] per team
//! 4. [`compute_indices`] and [`evaluate_flags`] per student, in parallel
//! 5. [`report`] / [`export`] project the result for display
//! 6. [`GradePublisher`] merges overrides and commits the grade batch

pub mod aggregate;
pub mod config;
pub mod domain;
pub mod export;
pub mod flags;
pub mod indices;
pub mod metrics;
pub mod obs;
pub mod pipeline;
pub mod publish;
pub mod report;
pub mod telemetry;

pub use aggregate::{aggregate, CriterionBreakdown, ScoredAllocation, StudentAggregate};
pub use config::GradingConfig;
pub use domain::{
    validate_snapshot, Allocation, Criterion, EvaluationId, EvaluationSnapshot, GradeRecord,
    PeerGradeError, Result, Rubric, ScaleBounds, ScoreItem, Student, Submission, Team, UserId,
    ValidationError,
};
pub use export::{dashboard_csv, flags_csv};
pub use flags::{evaluate_flags, Flag, FlagRule, FlagThresholds, Severity};
pub use indices::{
    compute_gcf, compute_indices, compute_spr, compute_suggested_grade, round_to,
    team_peer_means, ContributionIndices, RatioBounds,
};
pub use pipeline::{compute_evaluation, EvaluationResult, StudentResult};
pub use publish::{
    batch_digest, plan_publication, GradeOverride, GradePublisher, PublishIssue, PublishPolicy,
    PublishReceipt, PublishRequest,
};
pub use report::{
    DashboardResponse, DashboardRow, FlagsResponse, FlagsRow, GradePreviewItem,
    GradePreviewResponse,
};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
