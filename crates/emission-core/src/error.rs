use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::calculation::CalculationError;
use crate::config::ConfigError;
use crate::factors::{FactorLoadError, FactorStoreError};
use crate::telemetry::TelemetryError;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    FactorLoad(FactorLoadError),
    FactorStore(FactorStoreError),
    Calculation(CalculationError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::FactorLoad(err) => write!(f, "factor load error: {}", err),
            AppError::FactorStore(err) => write!(f, "factor store error: {}", err),
            AppError::Calculation(err) => write!(f, "calculation error: {}", err),
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
            AppError::FactorLoad(err) => Some(err),
            AppError::FactorStore(err) => Some(err),
            AppError::Calculation(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::FactorLoad(_) => StatusCode::BAD_REQUEST,
            AppError::Calculation(err) if err.is_conflict() => StatusCode::CONFLICT,
            AppError::Calculation(CalculationError::RecordNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Calculation(_) | AppError::FactorStore(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

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

impl From<FactorLoadError> for AppError {
    fn from(value: FactorLoadError) -> Self {
        Self::FactorLoad(value)
    }
}

impl From<FactorStoreError> for AppError {
    fn from(value: FactorStoreError) -> Self {
        Self::FactorStore(value)
    }
}

impl From<CalculationError> for AppError {
    fn from(value: CalculationError) -> Self {
        Self::Calculation(value)
    }
}
