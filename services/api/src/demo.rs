use crate::infra::{parse_mode, parse_profile, parse_scorer};
use clap::Args;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;
use vitamin_insight::analysis::{AnalysisPipeline, AnalysisRequest, AnalysisSession};
use vitamin_insight::catalog::NutrientId;
use vitamin_insight::config::{AppConfig, ScorerKind};
use vitamin_insight::error::AppError;
use vitamin_insight::report::{RenderableReport, ReportMode};
use vitamin_insight::scoring::PolicyProfile;
use vitamin_insight::telemetry;
use vitamin_insight::visual::ILLUSTRATIVE_NOTICE;

#[derive(Args, Debug)]
pub(crate) struct AnalyzeArgs {
    /// JPEG or PNG image to analyze
    pub(crate) image: PathBuf,
    /// Report mode: full or single
    #[arg(long, value_parser = parse_mode, default_value = "full")]
    pub(crate) mode: ReportMode,
    /// Nutrient to report on in single mode (e.g. "Vitamin D")
    #[arg(long)]
    pub(crate) nutrient: Option<String>,
    /// Omit symptom insights from the output
    #[arg(long)]
    pub(crate) hide_symptoms: bool,
    /// Write the illustrative heatmap as PNG to this path
    #[arg(long)]
    pub(crate) heatmap_out: Option<PathBuf>,
    /// Threshold profile: standard or healthy_biased
    #[arg(long, value_parser = parse_profile)]
    pub(crate) policy: Option<PolicyProfile>,
    /// Confidence source: demo or model
    #[arg(long, value_parser = parse_scorer)]
    pub(crate) scorer: Option<ScorerKind>,
    /// Seed for reproducible demo scores
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Artificial analysis delay in milliseconds
    #[arg(long)]
    pub(crate) latency_ms: Option<u64>,
    /// Print the report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Print the catalog as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let AnalyzeArgs {
        image,
        mode,
        nutrient,
        hide_symptoms,
        heatmap_out,
        policy,
        scorer,
        seed,
        latency_ms,
        json,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let mut analysis = config.analysis;
    if let Some(profile) = policy {
        analysis = analysis.with_profile(profile);
    }
    if let Some(scorer) = scorer {
        analysis.scorer = scorer;
    }
    if seed.is_some() {
        analysis.seed = seed;
    }
    if let Some(latency) = latency_ms {
        analysis.simulated_latency = Duration::from_millis(latency);
    }

    let declared = mime_guess::from_path(&image).first_or_octet_stream();
    if !is_supported_upload(&declared) {
        return Err(AppError::InvalidRequest(format!(
            "{} is declared as {}; upload a JPEG or PNG",
            image.display(),
            declared
        )));
    }

    let bytes = std::fs::read(&image)?;
    let pipeline = AnalysisPipeline::from_config(&analysis)?;
    let request = AnalysisRequest {
        mode,
        selection: nutrient.map(NutrientId::new),
    };

    let mut session = AnalysisSession::new();
    let outcome = session.analyze(&pipeline, &bytes, &request)?;

    if let Some(path) = heatmap_out {
        std::fs::write(&path, outcome.artifact.to_png()?)?;
        eprintln!("Heatmap written to {} ({ILLUSTRATIVE_NOTICE})", path.display());
    }

    let view = if hide_symptoms {
        outcome.view.clone().hide_symptoms()
    } else {
        outcome.view.clone()
    };

    if json {
        let body = serde_json::to_string_pretty(&view).map_err(std::io::Error::from)?;
        println!("{body}");
    } else {
        print!("{}", render_report_text(&view));
    }

    Ok(())
}

pub(crate) fn run_catalog(args: CatalogArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let pipeline = AnalysisPipeline::from_config(&config.analysis)?;
    let catalog = pipeline.catalog();

    if args.json {
        let body =
            serde_json::to_string_pretty(catalog.nutrients()).map_err(std::io::Error::from)?;
        println!("{body}");
        return Ok(());
    }

    println!("Nutrient catalog ({} entries)", catalog.len());
    for nutrient in catalog.nutrients() {
        println!("\n{}", nutrient.id);
        println!("- Foods to improve: {}", nutrient.recommended_foods.join(", "));
        if nutrient.foods_to_avoid.is_empty() {
            println!("- Foods to avoid: none listed");
        } else {
            println!("- Foods to avoid: {}", nutrient.foods_to_avoid.join(", "));
        }
        println!("- Possible symptoms: {}", nutrient.symptoms);
    }

    Ok(())
}

pub(crate) fn is_supported_upload(declared: &mime_guess::Mime) -> bool {
    matches!(declared.essence_str(), "image/png" | "image/jpeg")
}

pub(crate) fn render_report_text(view: &RenderableReport) -> String {
    let mut out = String::new();

    match view.mode {
        ReportMode::Single => {
            for entry in &view.entries {
                let _ = writeln!(out, "{} Status Report", entry.nutrient);
                let _ = writeln!(
                    out,
                    "Status: {} | Level: {} | Risk: {}",
                    entry.status_label, entry.percentage, entry.risk_label
                );
                let _ = writeln!(out, "\nFoods to improve levels");
                for food in &entry.recommended_foods {
                    let _ = writeln!(out, "- {food}");
                }
                let _ = writeln!(out, "\nFoods to avoid");
                for food in &entry.foods_to_avoid {
                    let _ = writeln!(out, "- {food}");
                }
                if let Some(symptoms) = &entry.symptoms {
                    let _ = writeln!(out, "\nPossible symptoms\n{symptoms}");
                }
            }
        }
        ReportMode::Full => {
            let _ = writeln!(out, "Complete Vitamin Analysis");
            let tally = view
                .status_tally()
                .into_iter()
                .map(|t| format!("{} {}", t.count, t.status_label))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "{tally}");
            for entry in &view.entries {
                let _ = writeln!(
                    out,
                    "\n{}: {} ({}), {}",
                    entry.nutrient, entry.status_label, entry.percentage, entry.risk_label
                );
                let _ = writeln!(out, "- Foods to improve: {}", entry.recommended_foods.join(", "));
                let _ = writeln!(out, "- Foods to avoid: {}", entry.foods_to_avoid.join(", "));
                if let Some(symptoms) = &entry.symptoms {
                    let _ = writeln!(out, "- Possible symptoms: {symptoms}");
                }
            }
        }
    }

    let _ = writeln!(out, "\n{}", view.disclaimer);
    out
}
