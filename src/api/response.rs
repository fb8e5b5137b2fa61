//! Response envelope shared by every endpoint.
//!
//! Every reply, success or failure, has the shape
//! `{"status": "success"|"failed", "code": <int>, "message": <str>, "data": <any|null>}`
//! and the HTTP status always equals `code`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: Outcome,
    pub code: u16,
    pub message: String,
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn success(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: Outcome::Success,
            code: status.as_u16(),
            message: message.into(),
            data: None,
        }
    }

    pub fn failed(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: Outcome::Failed,
            code: status.as_u16(),
            message: message.into(),
            data: None,
        }
    }

    /// Attach a payload. A payload that cannot be serialized becomes `null`.
    pub fn with_data<T: Serialize>(mut self, data: T) -> Self {
        self.data = match serde_json::to_value(data) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Failed to serialize response data: {}", e);
                None
            }
        };
        self
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Request-level failure. Each variant maps to exactly one status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Bad input shape or content (400)
    Validation(String),
    /// Bad credentials or token (401)
    Authentication(String),
    /// Referenced entity does not exist (404)
    NotFound(String),
    /// Duplicate registration (400)
    Conflict(String),
    /// Hashing, signing or storage failure (500)
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(m)
            | ApiError::Authentication(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.status_code().as_u16())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        ApiResponse::failed(self.status_code(), self.message()).into_response()
    }
}

/// Health check - GET /health
pub async fn health_check() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (ApiError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Conflict("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Authentication("x".into()), StatusCode::UNAUTHORIZED),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.clone().into_response().status(), status, "{:?}", err);
        }
    }

    #[tokio::test]
    async fn test_failed_envelope_has_null_data() {
        let response = ApiError::NotFound("User not found".into()).into_response();
        let json = body_json(response).await;

        assert_eq!(json["status"], "failed");
        assert_eq!(json["code"], 404);
        assert_eq!(json["message"], "User not found");
        assert!(json.get("data").unwrap().is_null());
    }

    #[tokio::test]
    async fn test_success_envelope_with_data() {
        let response = ApiResponse::success(StatusCode::CREATED, "done")
            .with_data(serde_json::json!({ "token": "abc" }))
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let json = body_json(response).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["code"], 201);
        assert_eq!(json["data"]["token"], "abc");
    }
}
