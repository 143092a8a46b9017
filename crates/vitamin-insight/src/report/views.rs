use super::ReportMode;
use crate::catalog::NutrientId;
use crate::scoring::{DeficiencyStatus, RiskLevel, ThresholdPolicy};
use serde::Serialize;

pub const MEDICAL_DISCLAIMER: &str =
    "This is only an AI estimate. Consult a doctor for medical confirmation.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientReportEntry {
    pub nutrient: NutrientId,
    pub status: DeficiencyStatus,
    pub status_label: &'static str,
    pub risk: RiskLevel,
    pub risk_label: &'static str,
    pub confidence: f64,
    pub percentage: String,
    pub recommended_foods: Vec<String>,
    pub foods_to_avoid: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusTally {
    pub status: DeficiencyStatus,
    pub status_label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderableReport {
    pub mode: ReportMode,
    pub lower_threshold: f64,
    pub upper_threshold: f64,
    pub entries: Vec<NutrientReportEntry>,
    pub disclaimer: &'static str,
}

impl RenderableReport {
    pub(crate) fn new(
        mode: ReportMode,
        policy: &ThresholdPolicy,
        entries: Vec<NutrientReportEntry>,
    ) -> Self {
        Self {
            mode,
            lower_threshold: policy.lower(),
            upper_threshold: policy.upper(),
            entries,
            disclaimer: MEDICAL_DISCLAIMER,
        }
    }

    /// Drops symptom text when the symptom-insight toggle is off.
    pub fn hide_symptoms(mut self) -> Self {
        for entry in &mut self.entries {
            entry.symptoms = None;
        }
        self
    }

    pub fn entry(&self, nutrient: &NutrientId) -> Option<&NutrientReportEntry> {
        self.entries.iter().find(|entry| &entry.nutrient == nutrient)
    }

    pub fn status_tally(&self) -> Vec<StatusTally> {
        DeficiencyStatus::ordered()
            .into_iter()
            .map(|status| StatusTally {
                status,
                status_label: status.label(),
                count: self
                    .entries
                    .iter()
                    .filter(|entry| entry.status == status)
                    .count(),
            })
            .collect()
    }
}
