use super::domain::DeficiencyStatus;
use serde::{Deserialize, Serialize};

/// Rejected threshold or sampling configuration. Raised while configuration
/// is loaded, never while scoring.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyMisconfiguration {
    #[error("{name} must be a finite value within [0, 1], got {value}")]
    OutOfUnitInterval { name: &'static str, value: f64 },
    #[error("lower threshold {lower} must be strictly below upper threshold {upper}")]
    InvertedThresholds { lower: f64, upper: f64 },
    #[error("sampling range minimum {min} must not exceed maximum {max}")]
    InvertedRange { min: f64, max: f64 },
}

fn unit_interval(name: &'static str, value: f64) -> Result<f64, PolicyMisconfiguration> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(PolicyMisconfiguration::OutOfUnitInterval { name, value })
    }
}

/// Two cut points splitting [0, 1] into Deficient, Borderline and Normal
/// bands using half-open intervals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdPolicy {
    lower: f64,
    upper: f64,
}

impl ThresholdPolicy {
    pub fn new(lower: f64, upper: f64) -> Result<Self, PolicyMisconfiguration> {
        let lower = unit_interval("lower threshold", lower)?;
        let upper = unit_interval("upper threshold", upper)?;
        if lower >= upper {
            return Err(PolicyMisconfiguration::InvertedThresholds { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    pub const fn standard() -> Self {
        Self {
            lower: 0.45,
            upper: 0.70,
        }
    }

    pub const fn healthy_biased() -> Self {
        Self {
            lower: 0.60,
            upper: 0.80,
        }
    }

    pub const fn lower(&self) -> f64 {
        self.lower
    }

    pub const fn upper(&self) -> f64 {
        self.upper
    }

    pub fn classify(&self, confidence: f64) -> DeficiencyStatus {
        if confidence < self.lower {
            DeficiencyStatus::Deficient
        } else if confidence < self.upper {
            DeficiencyStatus::Borderline
        } else {
            DeficiencyStatus::Normal
        }
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Closed interval the demo scorer draws confidences from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingRange {
    min: f64,
    max: f64,
}

impl SamplingRange {
    pub fn new(min: f64, max: f64) -> Result<Self, PolicyMisconfiguration> {
        let min = unit_interval("sampling minimum", min)?;
        let max = unit_interval("sampling maximum", max)?;
        if min > max {
            return Err(PolicyMisconfiguration::InvertedRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub const fn min(&self) -> f64 {
        self.min
    }

    pub const fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Named pairing of thresholds and sampling range.
///
/// `HealthyBiased` narrows sampling to the top of the scale and raises both
/// cut points; most draws land in Normal. Neither profile is authoritative,
/// callers pick one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyProfile {
    #[default]
    Standard,
    HealthyBiased,
}

impl PolicyProfile {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "standard" | "default" => Some(Self::Standard),
            "healthy_biased" | "healthy" | "optimistic" => Some(Self::HealthyBiased),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::HealthyBiased => "healthy_biased",
        }
    }

    pub const fn policy(self) -> ThresholdPolicy {
        match self {
            Self::Standard => ThresholdPolicy::standard(),
            Self::HealthyBiased => ThresholdPolicy::healthy_biased(),
        }
    }

    pub const fn sampling_range(self) -> SamplingRange {
        match self {
            Self::Standard => SamplingRange {
                min: 0.20,
                max: 0.95,
            },
            Self::HealthyBiased => SamplingRange {
                min: 0.70,
                max: 1.00,
            },
        }
    }
}
