use super::policy::ThresholdPolicy;
use crate::catalog::NutrientId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered from least to most sufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeficiencyStatus {
    Deficient,
    Borderline,
    Normal,
}

impl DeficiencyStatus {
    pub const fn ordered() -> [Self; 3] {
        [Self::Deficient, Self::Borderline, Self::Normal]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Deficient => "Deficient",
            Self::Borderline => "Borderline",
            Self::Normal => "Normal",
        }
    }

    /// Risk is never computed separately from status.
    pub const fn risk(self) -> RiskLevel {
        match self {
            Self::Deficient => RiskLevel::High,
            Self::Borderline => RiskLevel::Moderate,
            Self::Normal => RiskLevel::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    High,
    Moderate,
    Low,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "High Risk",
            Self::Moderate => "Moderate Risk",
            Self::Low => "Low Risk",
        }
    }
}

/// One nutrient's confidence and the status/risk derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSample {
    pub nutrient: NutrientId,
    pub confidence: f64,
    pub status: DeficiencyStatus,
    pub risk: RiskLevel,
}

impl ScoreSample {
    /// Callers must pass a confidence already validated to lie in [0, 1].
    pub fn classify(nutrient: NutrientId, confidence: f64, policy: &ThresholdPolicy) -> Self {
        let status = policy.classify(confidence);
        Self {
            nutrient,
            confidence,
            status,
            risk: status.risk(),
        }
    }

    pub fn percentage_label(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }

    /// Two-decimal confidence used for progress bars.
    pub fn rounded_confidence(&self) -> f64 {
        (self.confidence * 100.0).round() / 100.0
    }
}

/// Samples for every cataloged nutrient from a single analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeficiencyReport {
    policy: ThresholdPolicy,
    generated_at: DateTime<Utc>,
    samples: Vec<ScoreSample>,
}

impl DeficiencyReport {
    pub(crate) fn new(policy: ThresholdPolicy, samples: Vec<ScoreSample>) -> Self {
        Self {
            policy,
            generated_at: Utc::now(),
            samples,
        }
    }

    pub fn policy(&self) -> &ThresholdPolicy {
        &self.policy
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn samples(&self) -> &[ScoreSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, nutrient: &NutrientId) -> Option<&ScoreSample> {
        self.samples.iter().find(|sample| &sample.nutrient == nutrient)
    }

    pub fn count_by_status(&self, status: DeficiencyStatus) -> usize {
        self.samples
            .iter()
            .filter(|sample| sample.status == status)
            .count()
    }
}
