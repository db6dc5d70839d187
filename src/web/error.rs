//! Error responses for the JSON API

use crate::error::{ModelError, RecordError};
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed request body
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Record failed field validation
    #[error("Validation error: {0}")]
    Validation(#[from] RecordError),

    /// Well-formed JSON that does not describe a record
    #[error("Validation error: {0}")]
    InvalidRecord(String),

    /// Model never loaded; inference is disabled
    #[error("{0}")]
    ModelUnavailable(String),

    /// The classifier failed on this record
    #[error("{0}")]
    Prediction(String),
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::ResourceUnavailable { .. } => ApiError::ModelUnavailable(err.to_string()),
            ModelError::Prediction(_) => ApiError::Prediction(err.to_string()),
        }
    }
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) | ApiError::InvalidRecord(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse {
            error: match self {
                ApiError::BadRequest(_) => "bad_request",
                ApiError::Validation(_) | ApiError::InvalidRecord(_) => "validation_error",
                ApiError::ModelUnavailable(_) => "model_unavailable",
                ApiError::Prediction(_) => "prediction_error",
            }
            .to_string(),
            message: self.to_string(),
        };

        HttpResponse::build(self.status_code()).json(error_response)
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_errors_map_to_status() {
        let unavailable: ApiError = ModelError::ResourceUnavailable {
            path: "m.onnx".into(),
            message: "Model file 'm.onnx' not found.".into(),
        }
        .into();
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(unavailable.to_string(), "Model file 'm.onnx' not found.");

        let prediction: ApiError = ModelError::Prediction(anyhow::anyhow!("boom")).into();
        assert_eq!(prediction.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            prediction.to_string(),
            "An error occurred during prediction: boom"
        );
    }

    #[test]
    fn test_validation_is_unprocessable() {
        let err: ApiError = RecordError::Missing { field: "amount" }.into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = ApiError::InvalidRecord("missing field `amount`".into());
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.to_string(), "Validation error: missing field `amount`");
    }
}
