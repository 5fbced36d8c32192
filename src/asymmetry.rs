//! Left/right volumetric asymmetry classification.
//!
//! The asymmetry index is the signed difference between two paired volumes
//! as a percentage of their mean:
//!
//! ```text
//! index = (left - right) / ((left + right) / 2) * 100
//! ```
//!
//! Positive values are left-dominant, negative values right-dominant. The
//! magnitude is binned into clinical bands with inclusive upper bounds:
//!
//! | `|index|`            | Category     |
//! |----------------------|--------------|
//! | `<= normal_max`      | `normal`     |
//! | `<= borderline_max`  | `borderline` |
//! | above                | `abnormal`   |
//!
//! Everything here is pure. Invalid volumes are rejected, never clamped.

use serde::{Deserialize, Serialize};

use crate::errors::{ClassifyError, ThresholdError};

pub const DEFAULT_NORMAL_MAX: f64 = 8.0;
pub const DEFAULT_BORDERLINE_MAX: f64 = 12.0;

/// Clinical risk category for an asymmetry index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Normal,
    Borderline,
    Abnormal,
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskCategory::Normal => write!(f, "normal"),
            RiskCategory::Borderline => write!(f, "borderline"),
            RiskCategory::Abnormal => write!(f, "abnormal"),
        }
    }
}

impl std::str::FromStr for RiskCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(RiskCategory::Normal),
            "borderline" => Ok(RiskCategory::Borderline),
            "abnormal" => Ok(RiskCategory::Abnormal),
            _ => anyhow::bail!(
                "Invalid risk category '{}'. Valid values: normal, borderline, abnormal",
                s
            ),
        }
    }
}

/// Which hemisphere holds the larger volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dominance {
    Left,
    Right,
    Symmetric,
}

/// Outcome of classifying one left/right pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsymmetryResult {
    /// Structure name when classified as part of a report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<String>,
    /// Left volume in cm^3
    pub left_volume: f64,
    /// Right volume in cm^3
    pub right_volume: f64,
    /// Signed index, positive when left-dominant
    pub asymmetry_index_percent: f64,
    pub category: RiskCategory,
}

impl AsymmetryResult {
    pub fn dominance(&self) -> Dominance {
        if self.asymmetry_index_percent > 0.0 {
            Dominance::Left
        } else if self.asymmetry_index_percent < 0.0 {
            Dominance::Right
        } else {
            Dominance::Symmetric
        }
    }
}

/// Band boundaries for `RiskCategory`, as absolute index percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AsymmetryThresholds {
    /// Largest `|index|` still considered normal
    #[serde(default = "default_normal_max")]
    pub normal_max: f64,
    /// Largest `|index|` still considered borderline
    #[serde(default = "default_borderline_max")]
    pub borderline_max: f64,
}

fn default_normal_max() -> f64 {
    DEFAULT_NORMAL_MAX
}

fn default_borderline_max() -> f64 {
    DEFAULT_BORDERLINE_MAX
}

impl Default for AsymmetryThresholds {
    fn default() -> Self {
        Self {
            normal_max: default_normal_max(),
            borderline_max: default_borderline_max(),
        }
    }
}

impl AsymmetryThresholds {
    pub fn new(normal_max: f64, borderline_max: f64) -> Result<Self, ThresholdError> {
        let thresholds = Self {
            normal_max,
            borderline_max,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), ThresholdError> {
        for (name, value) in [
            ("normal_max", self.normal_max),
            ("borderline_max", self.borderline_max),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ThresholdError::InvalidBound { name, value });
            }
        }
        if self.normal_max > self.borderline_max {
            return Err(ThresholdError::Inverted {
                normal_max: self.normal_max,
                borderline_max: self.borderline_max,
            });
        }
        Ok(())
    }

    /// Bin an index into a category. Upper bounds are inclusive.
    pub fn categorize(&self, index_percent: f64) -> RiskCategory {
        let magnitude = index_percent.abs();
        if magnitude <= self.normal_max {
            RiskCategory::Normal
        } else if magnitude <= self.borderline_max {
            RiskCategory::Borderline
        } else {
            RiskCategory::Abnormal
        }
    }

    pub fn classify(&self, left: f64, right: f64) -> Result<AsymmetryResult, ClassifyError> {
        let index = asymmetry_index(left, right)?;
        Ok(AsymmetryResult {
            structure: None,
            left_volume: left,
            right_volume: right,
            asymmetry_index_percent: index,
            category: self.categorize(index),
        })
    }
}

/// Signed asymmetry index in percent. Two zero volumes give 0.
pub fn asymmetry_index(left: f64, right: f64) -> Result<f64, ClassifyError> {
    check_volume("left", left)?;
    check_volume("right", right)?;

    let mean = (left + right) / 2.0;
    if mean == 0.0 {
        return Ok(0.0);
    }
    Ok((left - right) / mean * 100.0)
}

fn check_volume(side: &'static str, value: f64) -> Result<(), ClassifyError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ClassifyError::InvalidVolume { side, value })
    }
}

/// Classify a pair of volumes with the default clinical bands.
pub fn classify(left: f64, right: f64) -> Result<AsymmetryResult, ClassifyError> {
    AsymmetryThresholds::default().classify(left, right)
}

/// A named left/right structure measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumePair {
    pub structure: String,
    pub left: f64,
    pub right: f64,
}

/// Classify several structures, preserving input order.
///
/// Stops at the first invalid pair; the error names the side but not the
/// structure, so callers that need it should log the pair themselves.
pub fn classify_pairs(
    pairs: &[VolumePair],
    thresholds: &AsymmetryThresholds,
) -> Result<Vec<AsymmetryResult>, ClassifyError> {
    pairs
        .iter()
        .map(|pair| {
            let mut result = thresholds.classify(pair.left, pair.right)?;
            result.structure = Some(pair.structure.clone());
            Ok(result)
        })
        .collect()
}
