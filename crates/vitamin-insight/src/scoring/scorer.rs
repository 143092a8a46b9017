use super::features::{ImageFeatures, FEATURE_COUNT};
use super::policy::SamplingRange;
use crate::catalog::{Nutrient, NutrientCatalog, NutrientId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("scorer '{scorer}' produced confidence {value} for {nutrient}, outside [0, 1]")]
    ConfidenceOutOfRange {
        scorer: &'static str,
        nutrient: NutrientId,
        value: f64,
    },
    #[error("scorer '{0}' requires image features")]
    MissingFeatures(&'static str),
    #[error("model has no output for {0}")]
    NoModelOutput(NutrientId),
}

/// Source of per-nutrient confidence values.
///
/// Implementations are swappable: the engine only relies on this contract
/// and validates every returned value.
pub trait ConfidenceScorer: Send + Sync {
    fn name(&self) -> &'static str;

    fn confidence(
        &self,
        nutrient: &Nutrient,
        features: Option<&ImageFeatures>,
    ) -> Result<f64, ScoringError>;
}

/// Uniform draws from a configured range. Non-authoritative: the image is
/// ignored, so results only exercise the reporting path.
pub struct RandomDemoScorer {
    range: SamplingRange,
    rng: Mutex<StdRng>,
}

impl RandomDemoScorer {
    pub fn new(range: SamplingRange) -> Self {
        Self {
            range,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(range: SamplingRange, seed: u64) -> Self {
        Self {
            range,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn range(&self) -> SamplingRange {
        self.range
    }
}

impl ConfidenceScorer for RandomDemoScorer {
    fn name(&self) -> &'static str {
        "random_demo"
    }

    fn confidence(
        &self,
        _nutrient: &Nutrient,
        _features: Option<&ImageFeatures>,
    ) -> Result<f64, ScoringError> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(rng.gen_range(self.range.min()..=self.range.max()))
    }
}

/// Predictive backend consumed by [`ModelScorer`].
pub trait DeficiencyModel: Send + Sync {
    fn predict(&self, nutrient: &NutrientId, features: &ImageFeatures)
        -> Result<f64, ScoringError>;
}

/// Confidence from a model over validated image features.
pub struct ModelScorer<M> {
    model: M,
}

impl<M: DeficiencyModel> ModelScorer<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: DeficiencyModel> ConfidenceScorer for ModelScorer<M> {
    fn name(&self) -> &'static str {
        "model"
    }

    fn confidence(
        &self,
        nutrient: &Nutrient,
        features: Option<&ImageFeatures>,
    ) -> Result<f64, ScoringError> {
        let features = features.ok_or(ScoringError::MissingFeatures(self.name()))?;
        self.model.predict(&nutrient.id, features)
    }
}

/// One sigmoid output head per nutrient over [`ImageFeatures`].
///
/// [`LinearProbeModel::untrained`] draws weights at random and is never
/// fitted; its predictions carry no information about the image.
#[derive(Debug, Clone)]
pub struct LinearProbeModel {
    heads: HashMap<NutrientId, ProbeHead>,
}

#[derive(Debug, Clone)]
struct ProbeHead {
    weights: [f64; FEATURE_COUNT],
    bias: f64,
}

impl LinearProbeModel {
    pub fn untrained(catalog: &NutrientCatalog, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let heads = catalog
            .list_nutrients()
            .into_iter()
            .map(|id| {
                let mut weights = [0.0; FEATURE_COUNT];
                for weight in &mut weights {
                    *weight = rng.gen_range(-1.0..1.0);
                }
                let bias = rng.gen_range(-0.5..0.5);
                (id, ProbeHead { weights, bias })
            })
            .collect();

        Self { heads }
    }

    pub fn with_head(mut self, nutrient: NutrientId, weights: [f64; FEATURE_COUNT], bias: f64) -> Self {
        self.heads.insert(nutrient, ProbeHead { weights, bias });
        self
    }
}

impl DeficiencyModel for LinearProbeModel {
    fn predict(
        &self,
        nutrient: &NutrientId,
        features: &ImageFeatures,
    ) -> Result<f64, ScoringError> {
        let head = self
            .heads
            .get(nutrient)
            .ok_or_else(|| ScoringError::NoModelOutput(nutrient.clone()))?;
        let activation: f64 = head
            .weights
            .iter()
            .zip(features.values())
            .map(|(weight, value)| weight * value)
            .sum::<f64>()
            + head.bias;
        Ok(1.0 / (1.0 + (-activation).exp()))
    }
}
