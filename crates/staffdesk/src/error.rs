use crate::config::ConfigError;
use crate::data::StoreError;
use crate::features::expenses::ExpenseImportError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Failures that reach the binary or an HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error("expense import error: {0}")]
    Import(#[from] ExpenseImportError),
    #[error("data store error: {0}")]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Import(_) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_errors_map_to_bad_request() {
        let error = AppError::from(ExpenseImportError::Row {
            line: 4,
            reason: "amount 'x' is not a number".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "expense import error: line 4: amount 'x' is not a number"
        );
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unavailable_store_maps_to_service_unavailable() {
        let response =
            AppError::from(StoreError::Unavailable("offline".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn config_errors_map_to_internal_error() {
        let error = AppError::from(ConfigError::Invalid {
            key: "APP_PORT",
            value: "http".to_string(),
            expected: "a port number",
        });
        assert_eq!(
            error.to_string(),
            "configuration error: APP_PORT='http' is not a port number"
        );
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
