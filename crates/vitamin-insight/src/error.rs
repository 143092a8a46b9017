use crate::analysis::AnalysisError;
use crate::catalog::CatalogError;
use crate::config::{AppEnvironment, ConfigError};
use crate::telemetry::TelemetryError;
use crate::visual::ArtifactEncodeError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Catalog(CatalogError),
    Analysis(AnalysisError),
    Encode(ArtifactEncodeError),
    InvalidRequest(String),
    SessionNotFound(String),
    NoReport,
    SelectionUnavailable,
    Timeout(Duration),
    Worker(String),
}

impl AppError {
    /// Production hides nutrient selection errors behind a generic message.
    pub fn for_environment(self, environment: AppEnvironment) -> Self {
        match self {
            AppError::Analysis(err) if environment.is_production() && err.is_unknown_nutrient() => {
                AppError::SelectionUnavailable
            }
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Analysis(AnalysisError::ImageDecode(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Analysis(err) if err.is_unknown_nutrient() => StatusCode::NOT_FOUND,
            AppError::Analysis(AnalysisError::Superseded) => StatusCode::CONFLICT,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::SessionNotFound(_) | AppError::NoReport | AppError::SelectionUnavailable => {
                StatusCode::NOT_FOUND
            }
            AppError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Catalog(_)
            | AppError::Analysis(_)
            | AppError::Encode(_)
            | AppError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Catalog(err) => write!(f, "catalog error: {}", err),
            AppError::Analysis(AnalysisError::ImageDecode(err)) => {
                write!(f, "{}. Please try again with a different image.", err)
            }
            AppError::Analysis(err) => write!(f, "analysis error: {}", err),
            AppError::Encode(err) => write!(f, "{}", err),
            AppError::InvalidRequest(detail) => write!(f, "invalid request: {}", detail),
            AppError::SessionNotFound(id) => write!(f, "session {} not found", id),
            AppError::NoReport => write!(f, "no analysis has completed for this session yet"),
            AppError::SelectionUnavailable => write!(f, "selection unavailable"),
            AppError::Timeout(limit) => {
                write!(f, "analysis did not finish within {} ms", limit.as_millis())
            }
            AppError::Worker(detail) => write!(f, "analysis worker failed: {}", detail),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Catalog(err) => Some(err),
            AppError::Analysis(err) => Some(err),
            AppError::Encode(err) => Some(err),
            AppError::InvalidRequest(_)
            | AppError::SessionNotFound(_)
            | AppError::NoReport
            | AppError::SelectionUnavailable
            | AppError::Timeout(_)
            | AppError::Worker(_) => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<CatalogError> for AppError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

impl From<AnalysisError> for AppError {
    fn from(value: AnalysisError) -> Self {
        Self::Analysis(value)
    }
}

impl From<ArtifactEncodeError> for AppError {
    fn from(value: ArtifactEncodeError) -> Self {
        Self::Encode(value)
    }
}
