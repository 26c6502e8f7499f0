use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

/// Standardized error envelope returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Always false for errors
    pub success: bool,

    /// Error type/code - machine-readable identifier
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    fn new(error: &str, message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            success: false,
            error: error.to_string(),
            message: message.into(),
            details,
        }
    }

    /// Create a validation error response
    pub fn validation_error(message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self::new("validation_error", message, details)
    }

    /// Create a validation error for a specific request field
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::validation_error(message, Some(json!({ "field": field })))
    }

    /// Create a missing field error response
    pub fn missing_field(field: &str) -> Self {
        Self::invalid_field(field, format!("Missing required field: {}", field))
    }

    /// Create a bad request error response
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message, None)
    }

    /// Create an unauthorized error response
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message, None)
    }

    /// Create a method not allowed error response
    pub fn method_not_allowed() -> Self {
        Self::new("method_not_allowed", "Method not allowed", None)
    }

    /// Create an internal error response
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("internal_error", message, None)
    }

    /// Map a JSON body rejection to the error envelope
    pub fn from_json_rejection(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                Self::bad_request("Content-Type must be application/json")
            }
            JsonRejection::JsonDataError(err) => Self::validation_error(
                "Invalid JSON data",
                Some(json!({ "reason": err.body_text() })),
            ),
            _ => Self::bad_request("Invalid JSON data"),
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self.error.as_str() {
            "validation_error" | "bad_request" => StatusCode::BAD_REQUEST,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "not_found" => StatusCode::NOT_FOUND,
            "method_not_allowed" => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}
