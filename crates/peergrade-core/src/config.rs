//! Grading configuration.
//!
//! Every knob the computation depends on lives here and is passed in
//! explicitly; nothing is read from globals. Any subset of fields may be
//! given in TOML, the rest fall back to defaults:
//!
//! ```toml
//! grade_scale = { min = 1.0, max = 10.0 }
//!
//! [ratio]
//! spr_max = 2.0
//! gcf_min = 0.5
//! gcf_max = 1.5
//!
//! [flags]
//! minimum_required_reviewers = 3
//! self_overrating_threshold = 1.25
//!
//! [publish]
//! reason_required_delta = 0.5
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{PeerGradeError, Result, ScaleBounds};
use crate::flags::FlagThresholds;
use crate::indices::RatioBounds;
use crate::publish::PublishPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    pub ratio: RatioBounds,
    /// Scale of group grades, suggestions and final grades.
    pub grade_scale: ScaleBounds,
    pub flags: FlagThresholds,
    pub publish: PublishPolicy,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            ratio: RatioBounds::default(),
            grade_scale: ScaleBounds::new(1.0, 10.0),
            flags: FlagThresholds::default(),
            publish: PublishPolicy::default(),
        }
    }
}

impl GradingConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: GradingConfig =
            toml::from_str(source).map_err(|e| PeerGradeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
            .map_err(|e| PeerGradeError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Reject configurations that would make clamping or comparisons
    /// meaningless.
    pub fn validate(&self) -> Result<()> {
        let bounded = |name: &str, s: ScaleBounds| -> Result<()> {
            if s.is_well_formed() {
                Ok(())
            } else {
                Err(PeerGradeError::Config(format!(
                    "{name}: [{}, {}] must be finite with min < max",
                    s.min, s.max
                )))
            }
        };
        bounded("grade_scale", self.grade_scale)?;
        bounded("ratio.spr", self.ratio.spr())?;
        bounded("ratio.gcf", self.ratio.gcf())?;

        if self.ratio.spr_min < 0.0 || self.ratio.gcf_min < 0.0 {
            return Err(PeerGradeError::Config(
                "ratio: lower bounds must be non-negative".to_string(),
            ));
        }

        let f = &self.flags;
        let thresholds = [
            f.self_overrating_threshold,
            f.self_underrating_threshold,
            f.low_gcf_threshold,
            f.high_gcf_threshold,
        ];
        if thresholds.iter().any(|t| !t.is_finite()) {
            return Err(PeerGradeError::Config(
                "flags: thresholds must be finite".to_string(),
            ));
        }
        if f.self_underrating_threshold > f.self_overrating_threshold {
            return Err(PeerGradeError::Config(format!(
                "flags: self_underrating_threshold {} exceeds self_overrating_threshold {}",
                f.self_underrating_threshold, f.self_overrating_threshold
            )));
        }
        if f.low_gcf_threshold > f.high_gcf_threshold {
            return Err(PeerGradeError::Config(format!(
                "flags: low_gcf_threshold {} exceeds high_gcf_threshold {}",
                f.low_gcf_threshold, f.high_gcf_threshold
            )));
        }

        let delta = self.publish.reason_required_delta;
        if !(delta.is_finite() && delta >= 0.0) {
            return Err(PeerGradeError::Config(format!(
                "publish.reason_required_delta: {delta} must be finite and non-negative"
            )));
        }
        Ok(())
    }
}
