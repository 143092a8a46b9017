//! Joins scored samples with catalog guidance into presentation-ready views.

pub mod views;

pub use views::{NutrientReportEntry, RenderableReport, StatusTally, MEDICAL_DISCLAIMER};

use crate::catalog::{Nutrient, NutrientCatalog, NutrientId};
use crate::scoring::{DeficiencyReport, ScoreSample};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    #[default]
    Full,
    Single,
}

impl ReportMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "full" | "full_catalog" | "all" => Some(Self::Full),
            "single" | "single_nutrient" => Some(Self::Single),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Full => "Full Vitamin Report",
            Self::Single => "Single Vitamin Analysis",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReportError {
    #[error("unknown nutrient '{0}'")]
    UnknownNutrient(NutrientId),
    #[error("a single nutrient report needs a selected nutrient")]
    MissingSelection,
    #[error("report has no sample for cataloged nutrient '{0}'")]
    MissingSample(NutrientId),
}

/// Builds the read-only view for `mode`. Full mode follows catalog order;
/// single mode requires `selection` to be present in both the report and the
/// catalog.
pub fn build(
    mode: ReportMode,
    selection: Option<&NutrientId>,
    report: &DeficiencyReport,
    catalog: &NutrientCatalog,
) -> Result<RenderableReport, ReportError> {
    let entries = match mode {
        ReportMode::Single => {
            let selected = selection.ok_or(ReportError::MissingSelection)?;
            let sample = report
                .get(selected)
                .ok_or_else(|| ReportError::UnknownNutrient(selected.clone()))?;
            let nutrient = catalog
                .get(selected)
                .map_err(|_| ReportError::UnknownNutrient(selected.clone()))?;
            vec![entry_for(sample, nutrient)]
        }
        ReportMode::Full => catalog
            .nutrients()
            .iter()
            .map(|nutrient| {
                report
                    .get(&nutrient.id)
                    .map(|sample| entry_for(sample, nutrient))
                    .ok_or_else(|| ReportError::MissingSample(nutrient.id.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?,
    };

    Ok(RenderableReport::new(mode, report.policy(), entries))
}

fn entry_for(sample: &ScoreSample, nutrient: &Nutrient) -> NutrientReportEntry {
    NutrientReportEntry {
        nutrient: sample.nutrient.clone(),
        status: sample.status,
        status_label: sample.status.label(),
        risk: sample.risk,
        risk_label: sample.risk.label(),
        confidence: sample.rounded_confidence(),
        percentage: sample.percentage_label(),
        recommended_foods: nutrient.recommended_foods.clone(),
        foods_to_avoid: nutrient.foods_to_avoid.clone(),
        symptoms: Some(nutrient.symptoms.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{DeficiencyStatus, ThresholdPolicy};

    fn report_for(catalog: &NutrientCatalog, confidence: f64) -> DeficiencyReport {
        let policy = ThresholdPolicy::standard();
        let samples = catalog
            .list_nutrients()
            .into_iter()
            .map(|id| ScoreSample::classify(id, confidence, &policy))
            .collect();
        DeficiencyReport::new(policy, samples)
    }

    #[test]
    fn full_mode_follows_catalog_order() {
        let catalog = NutrientCatalog::standard();
        let report = report_for(&catalog, 0.5);

        let view = build(ReportMode::Full, None, &report, &catalog).expect("builds");

        let names: Vec<NutrientId> = view.entries.iter().map(|e| e.nutrient.clone()).collect();
        assert_eq!(names, catalog.list_nutrients());
        assert!(view
            .entries
            .iter()
            .all(|entry| entry.status == DeficiencyStatus::Borderline
                && entry.percentage == "50.0%"
                && entry.symptoms.is_some()));
        assert_eq!(view.disclaimer, MEDICAL_DISCLAIMER);
    }

    #[test]
    fn single_mode_requires_a_selection() {
        let catalog = NutrientCatalog::standard();
        let report = report_for(&catalog, 0.9);
        assert_eq!(
            build(ReportMode::Single, None, &report, &catalog),
            Err(ReportError::MissingSelection)
        );
    }

    #[test]
    fn full_mode_rejects_incomplete_reports() {
        let catalog = NutrientCatalog::standard();
        let partial = DeficiencyReport::new(
            ThresholdPolicy::standard(),
            vec![ScoreSample::classify(
                NutrientId::from("Vitamin A"),
                0.2,
                &ThresholdPolicy::standard(),
            )],
        );
        assert_eq!(
            build(ReportMode::Full, None, &partial, &catalog),
            Err(ReportError::MissingSample(NutrientId::from("Vitamin B12")))
        );
    }

    #[test]
    fn hiding_symptoms_keeps_everything_else() {
        let catalog = NutrientCatalog::standard();
        let report = report_for(&catalog, 0.1);
        let view = build(ReportMode::Full, None, &report, &catalog).expect("builds");
        let hidden = view.clone().hide_symptoms();

        assert!(hidden.entries.iter().all(|entry| entry.symptoms.is_none()));
        assert_eq!(hidden.entries.len(), view.entries.len());
        assert_eq!(hidden.entries[0].recommended_foods, view.entries[0].recommended_foods);
        let tally = hidden.status_tally();
        assert_eq!(tally[0].count, catalog.len());
        assert_eq!(tally[2].count, 0);
    }

    #[test]
    fn parses_modes() {
        assert_eq!(ReportMode::parse("Single"), Some(ReportMode::Single));
        assert_eq!(ReportMode::parse("full"), Some(ReportMode::Full));
        assert_eq!(ReportMode::parse("partial"), None);
    }
}
