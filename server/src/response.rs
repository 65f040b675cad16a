//! Uniform JSON envelopes for the API
//!
//! Success responses are `{"success": true, "message", "data"}`; failures
//! are `{"success": false, "message", "code"}` with the mapped HTTP status.
//! The raw-GeoJSON endpoints bypass the envelope and return the document
//! itself.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::geojson::GeoJsonError;
use crate::layer::LayerError;

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_string(),
            data: Some(data),
        })
    }

    pub fn message_only(message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_string(),
            data: None,
        })
    }
}

/// Error envelope with a stable machine-readable code
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            code: code.to_string(),
        }
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new("unprocessable", message)
    }

    pub fn too_many_requests() -> Self {
        Self::new("rate_limited", "Too many requests, slow down")
    }
}

impl From<LayerError> for ErrorResponse {
    fn from(e: LayerError) -> Self {
        let code = match &e {
            LayerError::Validation(v) => match v {
                GeoJsonError::MalformedJson(_) => "malformed_json",
                GeoJsonError::MissingType => "missing_type",
                GeoJsonError::UnrecognizedType(_) => "unrecognized_type",
                GeoJsonError::FeatureMissingGeometry => "feature_missing_geometry",
                GeoJsonError::CollectionMissingFeatures => "collection_missing_features",
            },
            LayerError::NoGeometryExtracted => "no_geometry_extracted",
            LayerError::InvalidName(_) => "invalid_name",
            LayerError::NotFound(_) => "not_found",
            LayerError::PayloadTooLarge { .. } => "payload_too_large",
            LayerError::UnsupportedExtension(_) => "unsupported_extension",
            LayerError::Database(_) => "database_error",
        };
        Self::new(code, e.to_string())
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "payload_too_large" => StatusCode::PAYLOAD_TOO_LARGE,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "database_error" => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        };
        (status, Json(self)).into_response()
    }
}
