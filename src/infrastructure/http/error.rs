//! HTTP Error Handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::application::SynthesisError;

/// 统一错误响应格式
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: detail.into(),
        }
    }
}

/// API 错误
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, response) = match &self {
            ApiError::NotFound(msg) => {
                tracing::warn!(error = %msg, "Resource not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::new("not_found", msg.clone()),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(error = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("bad_request", msg.clone()),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("internal_error", msg.clone()),
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                tracing::error!(error = %msg, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new("service_unavailable", msg.clone()),
                )
            }
        };

        (status, Json(response)).into_response()
    }
}

impl From<SynthesisError> for ApiError {
    fn from(e: SynthesisError) -> Self {
        match e {
            SynthesisError::ConfigurationMissing(msg) => ApiError::NotFound(msg),
            SynthesisError::ModelFileMissing(msg) => ApiError::ServiceUnavailable(msg),
            SynthesisError::ReferenceAudioMissing(msg) => ApiError::ServiceUnavailable(msg),
            SynthesisError::ComponentLoad(msg) => ApiError::ServiceUnavailable(msg),
            SynthesisError::SessionConstruction(msg) => ApiError::Internal(msg),
            SynthesisError::Inference(msg) => ApiError::Internal(msg),
            SynthesisError::Encoding(msg) => ApiError::Internal(msg),
        }
    }
}
