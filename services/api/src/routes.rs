use crate::infra::{parse_mode, AnalysisState, AppState};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use vitamin_insight::analysis::{
    AnalysisError, AnalysisOutcome, AnalysisRequest, HeatmapSummary, SessionSnapshot,
};
use vitamin_insight::catalog::{Nutrient, NutrientId};
use vitamin_insight::error::AppError;
use vitamin_insight::report::{RenderableReport, ReportMode};
use vitamin_insight::visual::{ImageDecodeError, VisualArtifact, ILLUSTRATIVE_NOTICE};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AnalysisQuery {
    #[serde(default)]
    pub(crate) mode: Option<String>,
    #[serde(default)]
    pub(crate) nutrient: Option<String>,
    #[serde(default)]
    pub(crate) symptoms: Option<bool>,
}

impl AnalysisQuery {
    fn request(&self) -> Result<AnalysisRequest, AppError> {
        let mode = match &self.mode {
            Some(raw) => parse_mode(raw).map_err(AppError::InvalidRequest)?,
            None => ReportMode::Full,
        };
        Ok(AnalysisRequest {
            mode,
            selection: self.nutrient.as_deref().map(NutrientId::new),
        })
    }

    fn show_symptoms(&self) -> bool {
        self.symptoms.unwrap_or(true)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AnalysisResponse {
    pub(crate) scorer: &'static str,
    pub(crate) report: RenderableReport,
    pub(crate) heatmap: HeatmapSummary,
    pub(crate) heatmap_notice: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionCreatedResponse {
    pub(crate) session_id: String,
    pub(crate) session: SessionSnapshot,
}

pub(crate) fn analysis_router(state: AnalysisState) -> Router {
    let max_upload_bytes = state.pipeline.extractor().limits().max_bytes;
    Router::new()
        .route("/api/v1/nutrients", get(nutrients_endpoint))
        .route("/api/v1/analysis", post(analysis_endpoint))
        .route("/api/v1/heatmap", post(heatmap_endpoint))
        .route("/api/v1/sessions", post(create_session_endpoint))
        .route("/api/v1/sessions/:session_id", get(session_endpoint))
        .route(
            "/api/v1/sessions/:session_id/analysis",
            post(session_analysis_endpoint),
        )
        .route(
            "/api/v1/sessions/:session_id/detail",
            post(toggle_detail_endpoint),
        )
        .route(
            "/api/v1/sessions/:session_id/symptoms",
            post(toggle_symptoms_endpoint),
        )
        .route(
            "/api/v1/sessions/:session_id/heatmap",
            get(session_heatmap_endpoint),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

pub(crate) fn with_analysis_routes(state: AnalysisState) -> Router {
    analysis_router(state)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn nutrients_endpoint(State(state): State<AnalysisState>) -> Json<Vec<Nutrient>> {
    Json(state.pipeline.catalog().nutrients().to_vec())
}

pub(crate) async fn analysis_endpoint(
    State(state): State<AnalysisState>,
    Query(query): Query<AnalysisQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AnalysisResponse>, AppError> {
    let outcome = analyze_upload(&state, &query, &headers, body)
        .await
        .map_err(|err| err.for_environment(state.environment))?;

    Ok(Json(analysis_response(&state, &outcome, query.show_symptoms())))
}

pub(crate) async fn heatmap_endpoint(
    State(state): State<AnalysisState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    check_content_type(&headers)?;

    let pipeline = Arc::clone(&state.pipeline);
    let task = tokio::task::spawn_blocking(move || pipeline.extractor().extract(&body));
    let artifact = match tokio::time::timeout(state.timeout, task).await {
        Ok(Ok(result)) => result.map_err(AnalysisError::from)?,
        Ok(Err(join)) => return Err(AppError::Worker(join.to_string())),
        Err(_) => return Err(AppError::Timeout(state.timeout)),
    };

    png_response(&artifact)
}

pub(crate) async fn create_session_endpoint(
    State(state): State<AnalysisState>,
) -> (StatusCode, Json<SessionCreatedResponse>) {
    let (session_id, session) = state.sessions.create();
    (
        StatusCode::CREATED,
        Json(SessionCreatedResponse {
            session_id,
            session: session.snapshot(),
        }),
    )
}

pub(crate) async fn session_endpoint(
    State(state): State<AnalysisState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = state
        .sessions
        .with_session(&session_id, |session| session.snapshot())?;
    Ok(Json(snapshot))
}

pub(crate) async fn session_analysis_endpoint(
    State(state): State<AnalysisState>,
    Path(session_id): Path<String>,
    Query(query): Query<AnalysisQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AnalysisResponse>, AppError> {
    let (outcome, symptoms_visible) =
        analyze_in_session(&state, &session_id, &query, &headers, body)
            .await
            .map_err(|err| err.for_environment(state.environment))?;

    Ok(Json(analysis_response(&state, &outcome, symptoms_visible)))
}

pub(crate) async fn toggle_detail_endpoint(
    State(state): State<AnalysisState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let visible = state
        .sessions
        .with_session(&session_id, |session| session.toggle_detail())?;
    Ok(Json(json!({ "detail_visible": visible })))
}

pub(crate) async fn toggle_symptoms_endpoint(
    State(state): State<AnalysisState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let visible = state
        .sessions
        .with_session(&session_id, |session| session.toggle_symptoms())?;
    Ok(Json(json!({ "symptoms_visible": visible })))
}

pub(crate) async fn session_heatmap_endpoint(
    State(state): State<AnalysisState>,
    Path(session_id): Path<String>,
) -> Result<Response, AppError> {
    let current = state
        .sessions
        .with_session(&session_id, |session| session.current().cloned())?
        .ok_or(AppError::NoReport)?;
    png_response(&current.artifact)
}

fn analysis_response(
    state: &AnalysisState,
    outcome: &AnalysisOutcome,
    show_symptoms: bool,
) -> AnalysisResponse {
    let report = if show_symptoms {
        outcome.view.clone()
    } else {
        outcome.view.clone().hide_symptoms()
    };

    AnalysisResponse {
        scorer: state.pipeline.engine().scorer_name(),
        report,
        heatmap: HeatmapSummary::from(&outcome.artifact),
        heatmap_notice: ILLUSTRATIVE_NOTICE,
    }
}

fn png_response(artifact: &VisualArtifact) -> Result<Response, AppError> {
    let bytes = artifact.to_png()?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, artifact.content_type().to_string())],
        bytes,
    )
        .into_response())
}

/// Absent content types are sniffed; declared ones must be JPEG or PNG.
fn check_content_type(headers: &HeaderMap) -> Result<(), AppError> {
    let Some(value) = headers.get(header::CONTENT_TYPE) else {
        return Ok(());
    };

    let declared = value
        .to_str()
        .unwrap_or_default()
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match declared.as_str() {
        "image/png" | "image/jpeg" | "image/jpg" | "application/octet-stream" => Ok(()),
        _ => Err(AnalysisError::ImageDecode(ImageDecodeError::UnsupportedFormat(None)).into()),
    }
}

async fn analyze_upload(
    state: &AnalysisState,
    query: &AnalysisQuery,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<AnalysisOutcome, AppError> {
    check_content_type(headers)?;
    let request = query.request()?;
    let outcome = run_analysis(state, body, request).await??;
    Ok(outcome)
}

/// The session lock is held only to take a ticket and to publish the result.
/// A `symptoms` query value is stored on the session once the upload succeeds.
async fn analyze_in_session(
    state: &AnalysisState,
    session_id: &str,
    query: &AnalysisQuery,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<(Arc<AnalysisOutcome>, bool), AppError> {
    check_content_type(headers)?;
    let request = query.request()?;
    let ticket = state
        .sessions
        .with_session(session_id, |session| session.begin())?;

    match run_analysis(state, body, request).await {
        Ok(result) => {
            let published = state.sessions.with_session(session_id, |session| {
                let outcome = session.finish(ticket, result)?;
                if let Some(visible) = query.symptoms {
                    session.set_symptoms_visible(visible);
                }
                Ok::<_, AnalysisError>((outcome, session.symptoms_visible()))
            })?;
            Ok(published?)
        }
        Err(err) => {
            state
                .sessions
                .with_session(session_id, |session| session.abandon(ticket))?;
            Err(err)
        }
    }
}

async fn run_analysis(
    state: &AnalysisState,
    body: Bytes,
    request: AnalysisRequest,
) -> Result<Result<AnalysisOutcome, AnalysisError>, AppError> {
    let pipeline = Arc::clone(&state.pipeline);
    let task = tokio::task::spawn_blocking(move || pipeline.run(&body, &request));

    match tokio::time::timeout(state.timeout, task).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(join)) => Err(AppError::Worker(join.to_string())),
        Err(_) => Err(AppError::Timeout(state.timeout)),
    }
}
