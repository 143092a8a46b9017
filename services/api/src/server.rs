use crate::cli::ServeArgs;
use crate::infra::{AnalysisState, AppState, InMemorySessionStore};
use crate::routes::with_analysis_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use vitamin_insight::analysis::AnalysisPipeline;
use vitamin_insight::config::AppConfig;
use vitamin_insight::error::AppError;
use vitamin_insight::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let pipeline = AnalysisPipeline::from_config(&config.analysis)?;
    let analysis_state = AnalysisState {
        pipeline: Arc::new(pipeline),
        sessions: InMemorySessionStore::with_limits(config.sessions),
        environment: config.environment,
        timeout: config.analysis.timeout,
    };

    let app = with_analysis_routes(analysis_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        profile = config.analysis.profile.label(),
        scorer = ?config.analysis.scorer,
        "vitamin insight api ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
