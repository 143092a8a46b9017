use image::{ImageFormat, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use vitamin_insight::analysis::{
    AnalysisError, AnalysisPipeline, AnalysisRequest, AnalysisSession, SessionState,
};
use vitamin_insight::catalog::{Nutrient, NutrientCatalog, NutrientId};
use vitamin_insight::report::{self, ReportError, ReportMode};
use vitamin_insight::scoring::{
    ConfidenceScorer, DeficiencyStatus, ImageFeatures, RiskLevel, ScoringEngine, ScoringError,
    ThresholdPolicy,
};
use vitamin_insight::visual::{HeatmapExtractor, ImageDecodeError};

struct FixedScorer(HashMap<NutrientId, f64>);

impl FixedScorer {
    fn new(pairs: &[(&str, f64)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(name, value)| (NutrientId::from(*name), *value))
                .collect(),
        )
    }
}

impl ConfidenceScorer for FixedScorer {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn confidence(
        &self,
        nutrient: &Nutrient,
        _features: Option<&ImageFeatures>,
    ) -> Result<f64, ScoringError> {
        Ok(self.0.get(&nutrient.id).copied().unwrap_or(0.5))
    }
}

fn two_vitamin_catalog() -> NutrientCatalog {
    let standard = NutrientCatalog::standard();
    let pick = |name: &str| {
        standard
            .get(&NutrientId::from(name))
            .expect("standard nutrient")
            .clone()
    };
    NutrientCatalog::new(vec![pick("Vitamin A"), pick("Vitamin B12")]).expect("valid catalog")
}

fn fixed_engine() -> ScoringEngine {
    ScoringEngine::new(
        Arc::new(FixedScorer::new(&[("Vitamin A", 0.30), ("Vitamin B12", 0.80)])),
        ThresholdPolicy::new(0.45, 0.70).expect("valid policy"),
    )
}

fn fixed_pipeline() -> AnalysisPipeline {
    AnalysisPipeline::new(
        Arc::new(two_vitamin_catalog()),
        fixed_engine(),
        HeatmapExtractor::default(),
    )
}

fn sample_png() -> Vec<u8> {
    let image = RgbImage::from_fn(48, 32, |x, y| Rgb([(x * 5) as u8, (y * 7) as u8, 128]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("png encodes");
    bytes
}

#[test]
fn fixed_confidences_map_to_expected_statuses() {
    let catalog = two_vitamin_catalog();
    let report = fixed_engine()
        .score_all(&catalog, None)
        .expect("scoring succeeds");

    assert_eq!(report.len(), 2);
    let a = report.get(&NutrientId::from("Vitamin A")).expect("A scored");
    assert_eq!(a.status, DeficiencyStatus::Deficient);
    assert_eq!(a.risk, RiskLevel::High);
    let b12 = report
        .get(&NutrientId::from("Vitamin B12"))
        .expect("B12 scored");
    assert_eq!(b12.status, DeficiencyStatus::Normal);
    assert_eq!(b12.risk, RiskLevel::Low);
}

#[test]
fn single_mode_returns_only_the_selection() {
    let catalog = two_vitamin_catalog();
    let report = fixed_engine().score_all(&catalog, None).expect("scores");
    let selection = NutrientId::from("B12");

    // short names are not catalog ids
    assert_eq!(
        report::build(ReportMode::Single, Some(&selection), &report, &catalog),
        Err(ReportError::UnknownNutrient(selection))
    );

    let selection = NutrientId::from("Vitamin B12");
    let view = report::build(ReportMode::Single, Some(&selection), &report, &catalog)
        .expect("selection exists");
    assert_eq!(view.entries.len(), 1);
    assert_eq!(view.entries[0].nutrient, selection);
    assert_eq!(view.entries[0].status, DeficiencyStatus::Normal);
    assert_eq!(view.entries[0].percentage, "80.0%");
    assert_eq!(view.entries[0].risk_label, "Low Risk");
}

#[test]
fn building_twice_is_structurally_equal() {
    let catalog = two_vitamin_catalog();
    let report = fixed_engine().score_all(&catalog, None).expect("scores");

    let first = report::build(ReportMode::Full, None, &report, &catalog).expect("builds");
    let second = report::build(ReportMode::Full, None, &report, &catalog).expect("builds");
    assert_eq!(first, second);
}

#[test]
fn unknown_selection_fails_with_unknown_nutrient() {
    let catalog = two_vitamin_catalog();
    let report = fixed_engine().score_all(&catalog, None).expect("scores");
    let selection = NutrientId::from("Vitamin Z");

    let err = report::build(ReportMode::Single, Some(&selection), &report, &catalog)
        .expect_err("not cataloged");
    assert_eq!(err, ReportError::UnknownNutrient(selection));
}

#[test]
fn session_reports_after_successful_upload() {
    let pipeline = fixed_pipeline();
    let mut session = AnalysisSession::new();
    assert_eq!(session.state(), SessionState::Idle);

    let outcome = session
        .analyze(&pipeline, &sample_png(), &AnalysisRequest::full())
        .expect("analysis succeeds");

    assert_eq!(session.state(), SessionState::Reported);
    assert_eq!(outcome.view.entries.len(), 2);
    assert_eq!(outcome.artifact.width(), 48);
    assert_eq!(outcome.artifact.height(), 32);
    let snapshot = session.snapshot();
    assert!(snapshot.report.is_some());
    assert_eq!(snapshot.heatmap.expect("heatmap summary").width, 48);
}

#[test]
fn malformed_upload_keeps_previous_report() {
    let pipeline = fixed_pipeline();
    let mut session = AnalysisSession::new();
    let first = session
        .analyze(&pipeline, &sample_png(), &AnalysisRequest::full())
        .expect("first analysis succeeds");

    let err = session
        .analyze(&pipeline, b"\x89PNG\r\n\x1a\nbroken", &AnalysisRequest::full())
        .expect_err("malformed upload");

    assert!(matches!(
        err,
        AnalysisError::ImageDecode(ImageDecodeError::Malformed(_))
    ));
    assert_eq!(session.state(), SessionState::Reported);
    let current = session.current().expect("prior report kept");
    assert!(Arc::ptr_eq(current, &first));
}

#[test]
fn malformed_first_upload_stays_idle() {
    let pipeline = fixed_pipeline();
    let mut session = AnalysisSession::new();

    let err = session
        .analyze(&pipeline, b"not an image", &AnalysisRequest::full())
        .expect_err("not an image");

    assert!(matches!(err, AnalysisError::ImageDecode(_)));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.current().is_none());
}

#[test]
fn new_upload_replaces_the_report() {
    let pipeline = fixed_pipeline();
    let mut session = AnalysisSession::new();
    let first = session
        .analyze(&pipeline, &sample_png(), &AnalysisRequest::full())
        .expect("first");
    let second = session
        .analyze(
            &pipeline,
            &sample_png(),
            &AnalysisRequest::single("Vitamin A"),
        )
        .expect("second");

    assert!(!Arc::ptr_eq(&first, &second));
    let current = session.current().expect("current report");
    assert!(Arc::ptr_eq(current, &second));
    assert_eq!(current.view.mode, ReportMode::Single);
    assert_eq!(current.view.entries[0].status, DeficiencyStatus::Deficient);
}

#[test]
fn stale_results_are_discarded() {
    let pipeline = fixed_pipeline();
    let mut session = AnalysisSession::new();

    let stale = session.begin();
    let fresh = session.begin();
    let stale_result = pipeline.run(&sample_png(), &AnalysisRequest::full());
    assert!(matches!(
        session.finish(stale, stale_result),
        Err(AnalysisError::Superseded)
    ));
    assert_eq!(session.state(), SessionState::Analyzing);

    let fresh_result = pipeline.run(&sample_png(), &AnalysisRequest::full());
    session.finish(fresh, fresh_result).expect("latest wins");
    assert_eq!(session.state(), SessionState::Reported);
}

#[test]
fn abandoned_analysis_restores_previous_state() {
    let pipeline = fixed_pipeline();
    let mut session = AnalysisSession::new();
    let first = session
        .analyze(&pipeline, &sample_png(), &AnalysisRequest::full())
        .expect("first analysis");

    let ticket = session.begin();
    assert_eq!(session.state(), SessionState::Analyzing);
    session.abandon(ticket);

    assert_eq!(session.state(), SessionState::Reported);
    assert!(Arc::ptr_eq(session.current().expect("report kept"), &first));
}

#[test]
fn abandoning_a_stale_ticket_leaves_the_newer_run_alone() {
    let pipeline = fixed_pipeline();
    let mut session = AnalysisSession::new();

    let stale = session.begin();
    let fresh = session.begin();
    session.abandon(stale);
    assert_eq!(session.state(), SessionState::Analyzing);

    let result = pipeline.run(&sample_png(), &AnalysisRequest::full());
    session.finish(fresh, result).expect("fresh run publishes");
    assert_eq!(session.state(), SessionState::Reported);
}

#[test]
fn symptom_toggle_applies_to_session_views() {
    let pipeline = fixed_pipeline();
    let mut session = AnalysisSession::new();
    assert!(session.symptoms_visible());

    session
        .analyze(&pipeline, &sample_png(), &AnalysisRequest::full())
        .expect("analysis");
    session.set_symptoms_visible(false);

    let snapshot = session.snapshot();
    assert!(!snapshot.symptoms_visible);
    let report = snapshot.report.expect("report");
    assert!(report.entries.iter().all(|entry| entry.symptoms.is_none()));

    assert!(session.toggle_symptoms());
    let report = session.report_view().expect("report");
    assert!(report.entries.iter().all(|entry| entry.symptoms.is_some()));
}

#[test]
fn unknown_selection_is_rejected_before_decoding() {
    let pipeline = fixed_pipeline();
    let mut session = AnalysisSession::new();

    let err = session
        .analyze(
            &pipeline,
            b"not an image",
            &AnalysisRequest::single("Vitamin Z"),
        )
        .expect_err("unknown selection");

    assert!(err.is_unknown_nutrient());
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn detail_toggle_is_independent_of_state() {
    let pipeline = fixed_pipeline();
    let mut session = AnalysisSession::new();

    assert!(!session.detail_visible());
    assert!(session.toggle_detail());
    session
        .analyze(&pipeline, &sample_png(), &AnalysisRequest::full())
        .expect("analysis");
    assert!(session.detail_visible());
    assert!(!session.toggle_detail());
    assert_eq!(session.state(), SessionState::Reported);
}
