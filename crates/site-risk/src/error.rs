use crate::config::ConfigError;
use crate::resources::{FetchError, ResourceLoadError};
use crate::telemetry::TelemetryError;
use crate::workflows::risk::PredictionError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Drive(FetchError),
    Resources(ResourceLoadError),
    Assessment(PredictionError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Drive(err) => write!(f, "drive error: {}", err),
            AppError::Resources(err) => write!(f, "resource load error: {}", err),
            AppError::Assessment(err) => write!(f, "assessment error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Drive(err) => Some(err),
            AppError::Resources(err) => Some(err),
            AppError::Assessment(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Assessment(PredictionError::Encoding(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Assessment(PredictionError::Inference(_))
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Drive(_)
            | AppError::Resources(_) => StatusCode::INTERNAL_SERVER_ERROR,
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

impl From<FetchError> for AppError {
    fn from(value: FetchError) -> Self {
        Self::Drive(value)
    }
}

impl From<ResourceLoadError> for AppError {
    fn from(value: ResourceLoadError) -> Self {
        Self::Resources(value)
    }
}

impl From<PredictionError> for AppError {
    fn from(value: PredictionError) -> Self {
        Self::Assessment(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::risk::{Dimension, EncodingError, InferenceError};

    #[test]
    fn unknown_category_maps_to_unprocessable_entity() {
        let err = AppError::from(PredictionError::from(EncodingError::UnknownCategory {
            column: Dimension::WorkType.column_name(),
            value: "Juggling".to_string(),
        }));
        assert!(err.to_string().contains("Juggling"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn inference_failure_maps_to_internal_error() {
        let err = AppError::from(PredictionError::from(InferenceError::UnsupportedFeature {
            column: "Region".to_string(),
        }));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn drive_failure_maps_to_internal_error() {
        let err = AppError::from(FetchError::Credentials("drive.json: not found".to_string()));
        assert!(err.to_string().starts_with("drive error:"));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
