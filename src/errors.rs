// src/errors.rs
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviveError {
    #[error("Model service error: {0}")]
    Model(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ResponseError for ReviveError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ReviveError::Model(_) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "error": "AI service error",
                "message": self.to_string()
            })),
            ReviveError::ImageProcessing(_) => {
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "Image processing error",
                    "message": self.to_string()
                }))
            }
            ReviveError::Serialization(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Data processing error",
                    "message": self.to_string()
                }))
            }
            ReviveError::Validation(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Validation error",
                "message": self.to_string()
            })),
            ReviveError::Config(_) => HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Configuration error",
                "message": self.to_string()
            })),
            ReviveError::NotFound(_) => HttpResponse::NotFound().json(serde_json::json!({
                "error": "Not found",
                "message": self.to_string()
            })),
        }
    }
}

/// Why a restoration run ended without an image.
///
/// Every variant is terminal for the run that produced it; retrying means
/// starting a new run.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum FailureReason {
    #[error("API connection error: {0}")]
    ApiError(String),

    #[error("Model returned text instead of an image: {0}")]
    ModelReturnedTextOnly(String),

    #[error("No image data received")]
    NoImageData,
}

impl FailureReason {
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::ApiError(_) => "api_error",
            FailureReason::ModelReturnedTextOnly(_) => "model_returned_text_only",
            FailureReason::NoImageData => "no_image_data",
        }
    }
}

impl From<ReviveError> for FailureReason {
    fn from(err: ReviveError) -> Self {
        FailureReason::ApiError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ReviveError::Model("down".into()).error_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ReviveError::Validation("bad".into()).error_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ReviveError::NotFound("run".into()).error_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_service_error_becomes_api_failure() {
        let reason: FailureReason = ReviveError::Model("connection reset".into()).into();
        assert_eq!(
            reason,
            FailureReason::ApiError("Model service error: connection reset".into())
        );
        assert_eq!(reason.code(), "api_error");
    }

    #[test]
    fn test_failure_serializes_with_kind() {
        let json = serde_json::to_value(FailureReason::ModelReturnedTextOnly("no".into())).unwrap();
        assert_eq!(json["kind"], "ModelReturnedTextOnly");
        assert_eq!(json["detail"], "no");

        let json = serde_json::to_value(FailureReason::NoImageData).unwrap();
        assert_eq!(json["kind"], "NoImageData");
    }
}
