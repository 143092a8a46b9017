//! End-to-end analysis: decode, heatmap, score every nutrient, build views.

mod session;

pub use session::{
    AnalysisSession, AnalysisTicket, HeatmapSummary, SessionSnapshot, SessionState,
};

use crate::catalog::{CatalogError, NutrientCatalog, NutrientId};
use crate::config::{AnalysisConfig, ScorerKind};
use crate::report::{self, RenderableReport, ReportError, ReportMode};
use crate::scoring::{
    ConfidenceScorer, DeficiencyReport, ImageFeatures, LinearProbeModel, ModelScorer,
    RandomDemoScorer, ScoringEngine, ScoringError,
};
use crate::visual::{HeatmapExtractor, ImageDecodeError, VisualArtifact};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    ImageDecode(#[from] ImageDecodeError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("analysis was superseded by a newer upload")]
    Superseded,
}

impl AnalysisError {
    pub fn is_unknown_nutrient(&self) -> bool {
        matches!(
            self,
            AnalysisError::Report(ReportError::UnknownNutrient(_) | ReportError::MissingSelection)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub mode: ReportMode,
    #[serde(default)]
    pub selection: Option<NutrientId>,
}

impl AnalysisRequest {
    pub fn full() -> Self {
        Self::default()
    }

    pub fn single(nutrient: impl Into<NutrientId>) -> Self {
        Self {
            mode: ReportMode::Single,
            selection: Some(nutrient.into()),
        }
    }
}

/// Everything one analysis produced. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub request: AnalysisRequest,
    pub report: DeficiencyReport,
    pub view: RenderableReport,
    pub artifact: VisualArtifact,
}

pub struct AnalysisPipeline {
    catalog: Arc<NutrientCatalog>,
    engine: ScoringEngine,
    extractor: HeatmapExtractor,
    simulated_latency: Duration,
}

impl AnalysisPipeline {
    pub fn new(
        catalog: Arc<NutrientCatalog>,
        engine: ScoringEngine,
        extractor: HeatmapExtractor,
    ) -> Self {
        Self {
            catalog,
            engine,
            extractor,
            simulated_latency: Duration::ZERO,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self, CatalogError> {
        let catalog = match &config.catalog_csv {
            Some(path) => NutrientCatalog::from_path(path)?,
            None => NutrientCatalog::standard(),
        };

        let scorer: Arc<dyn ConfidenceScorer> = match config.scorer {
            ScorerKind::Demo => Arc::new(match config.seed {
                Some(seed) => RandomDemoScorer::seeded(config.sampling, seed),
                None => RandomDemoScorer::new(config.sampling),
            }),
            ScorerKind::Model => Arc::new(ModelScorer::new(LinearProbeModel::untrained(
                &catalog,
                config.seed,
            ))),
        };

        let engine = ScoringEngine::new(scorer, config.policy);
        let extractor = HeatmapExtractor::new(config.decode_limits);

        Ok(Self::new(Arc::new(catalog), engine, extractor)
            .with_simulated_latency(config.simulated_latency))
    }

    /// Artificial delay before scoring; zero skips it.
    pub fn with_simulated_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = latency;
        self
    }

    pub fn catalog(&self) -> &Arc<NutrientCatalog> {
        &self.catalog
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    pub fn extractor(&self) -> &HeatmapExtractor {
        &self.extractor
    }

    pub fn run(
        &self,
        bytes: &[u8],
        request: &AnalysisRequest,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        if request.mode == ReportMode::Single {
            let selected = request
                .selection
                .as_ref()
                .ok_or(ReportError::MissingSelection)?;
            if !self.catalog.contains(selected) {
                return Err(ReportError::UnknownNutrient(selected.clone()).into());
            }
        }

        let image = self.extractor.decode(bytes)?;
        let artifact = self.extractor.render(&image);
        let features = ImageFeatures::from_image(&image);

        if !self.simulated_latency.is_zero() {
            std::thread::sleep(self.simulated_latency);
        }

        let report = self.engine.score_all(&self.catalog, Some(&features))?;
        let view = report::build(
            request.mode,
            request.selection.as_ref(),
            &report,
            &self.catalog,
        )?;

        info!(
            scorer = self.engine.scorer_name(),
            mode = request.mode.label(),
            nutrients = report.len(),
            width = artifact.width(),
            height = artifact.height(),
            "analysis completed"
        );

        Ok(AnalysisOutcome {
            request: request.clone(),
            report,
            view,
            artifact,
        })
    }
}
