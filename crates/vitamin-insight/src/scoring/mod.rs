//! Confidence scoring and status classification.

mod domain;
mod features;
mod policy;
mod scorer;

pub use domain::{DeficiencyReport, DeficiencyStatus, RiskLevel, ScoreSample};
pub use features::{ImageFeatures, FEATURE_COUNT, MODEL_INPUT_SIZE};
pub use policy::{PolicyMisconfiguration, PolicyProfile, SamplingRange, ThresholdPolicy};
pub use scorer::{
    ConfidenceScorer, DeficiencyModel, LinearProbeModel, ModelScorer, RandomDemoScorer,
    ScoringError,
};

use crate::catalog::{Nutrient, NutrientCatalog};
use std::sync::Arc;
use tracing::debug;

/// Pairs a confidence source with the active threshold policy.
#[derive(Clone)]
pub struct ScoringEngine {
    scorer: Arc<dyn ConfidenceScorer>,
    policy: ThresholdPolicy,
}

impl ScoringEngine {
    pub fn new(scorer: Arc<dyn ConfidenceScorer>, policy: ThresholdPolicy) -> Self {
        Self { scorer, policy }
    }

    pub fn policy(&self) -> &ThresholdPolicy {
        &self.policy
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    pub fn score(
        &self,
        nutrient: &Nutrient,
        features: Option<&ImageFeatures>,
    ) -> Result<ScoreSample, ScoringError> {
        let confidence = self.scorer.confidence(nutrient, features)?;
        if !(confidence.is_finite() && (0.0..=1.0).contains(&confidence)) {
            return Err(ScoringError::ConfidenceOutOfRange {
                scorer: self.scorer.name(),
                nutrient: nutrient.id.clone(),
                value: confidence,
            });
        }

        let sample = ScoreSample::classify(nutrient.id.clone(), confidence, &self.policy);
        debug!(
            nutrient = %sample.nutrient,
            confidence = sample.confidence,
            status = sample.status.label(),
            "nutrient scored"
        );
        Ok(sample)
    }

    /// Scores every cataloged nutrient; any failure discards the whole run.
    pub fn score_all(
        &self,
        catalog: &NutrientCatalog,
        features: Option<&ImageFeatures>,
    ) -> Result<DeficiencyReport, ScoringError> {
        let samples = catalog
            .nutrients()
            .iter()
            .map(|nutrient| self.score(nutrient, features))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DeficiencyReport::new(self.policy, samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NutrientId;

    struct ConstantScorer(f64);

    impl ConfidenceScorer for ConstantScorer {
        fn name(&self) -> &'static str {
            "constant"
        }

        fn confidence(
            &self,
            _nutrient: &Nutrient,
            _features: Option<&ImageFeatures>,
        ) -> Result<f64, ScoringError> {
            Ok(self.0)
        }
    }

    #[test]
    fn score_all_covers_every_nutrient_once() {
        let catalog = NutrientCatalog::standard();
        let range = PolicyProfile::Standard.sampling_range();
        let engine = ScoringEngine::new(
            Arc::new(RandomDemoScorer::seeded(range, 11)),
            ThresholdPolicy::standard(),
        );

        let report = engine.score_all(&catalog, None).expect("demo scoring succeeds");

        assert_eq!(report.len(), catalog.len());
        for id in catalog.list_nutrients() {
            let matches = report
                .samples()
                .iter()
                .filter(|sample| sample.nutrient == id)
                .count();
            assert_eq!(matches, 1, "{id} should appear exactly once");
        }
        let order: Vec<NutrientId> = report.samples().iter().map(|s| s.nutrient.clone()).collect();
        assert_eq!(order, catalog.list_nutrients());
    }

    #[test]
    fn out_of_range_confidence_aborts_the_run() {
        let catalog = NutrientCatalog::standard();
        let engine = ScoringEngine::new(Arc::new(ConstantScorer(1.2)), ThresholdPolicy::standard());

        let err = engine.score_all(&catalog, None).expect_err("invalid confidence");
        assert!(matches!(
            err,
            ScoringError::ConfidenceOutOfRange { scorer: "constant", .. }
        ));
    }

    #[test]
    fn healthy_biased_profile_never_reports_deficiency() {
        let catalog = NutrientCatalog::standard();
        let profile = PolicyProfile::HealthyBiased;
        let engine = ScoringEngine::new(
            Arc::new(RandomDemoScorer::seeded(profile.sampling_range(), 5)),
            profile.policy(),
        );

        for _ in 0..50 {
            let report = engine.score_all(&catalog, None).expect("scoring succeeds");
            assert_eq!(report.count_by_status(DeficiencyStatus::Deficient), 0);
        }
    }
}
