//! Domain models for peergrade.
//!
//! The canonical records (rubric, allocations, submissions, cohort, grade
//! records) are owned by `peergrade-state` and re-exported here together
//! with the error taxonomy and snapshot validation.

pub mod error;
pub mod validation;

pub use error::{PeerGradeError, Result, ValidationError};
pub use peergrade_state::records::*;
pub use validation::validate_snapshot;
