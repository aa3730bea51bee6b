//! Error Handling Module
//!
//! Provides type-safe error handling with proper HTTP status code mapping.
//! Uses thiserror for domain errors and integrates with tracing for structured logging.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::db::StoreError;

/// API 에러 타입
///
/// # Design Decision
///
/// 각 에러 variant는 적절한 HTTP 상태 코드에 매핑됨
/// - ValidationError / BadRequest: 400 (사용자가 고칠 수 있음)
/// - AuthError: 401
/// - NotFound: 404 (클라이언트 desync)
/// - StorageError: 500 (재시도하지 않음)
///
/// 민감한 내부 정보는 클라이언트에 노출하지 않음
#[derive(Debug, Error)]
pub enum ApiError {
    // ============ 400 Bad Request ============
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    // ============ 401 Unauthorized ============
    #[error("Invalid email or password")]
    AuthError,

    // ============ 404 Not Found ============
    #[error("Resource not found: {0}")]
    NotFound(String),

    // ============ 500 Internal Server Error ============
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// API 에러 응답 구조
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // 4xx 클라이언트 에러
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::ValidationError(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            ApiError::AuthError => (
                StatusCode::UNAUTHORIZED,
                "AUTH_ERROR",
                "Invalid email or password".to_string(),
            ),
            ApiError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{} not found", resource),
            ),

            // 5xx 서버 에러
            ApiError::StorageError(_) => {
                // 내부 에러는 클라이언트에 상세 정보 노출 안 함
                tracing::error!("Storage error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "Database error".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// StoreError를 ApiError로 변환
///
/// 중복 이메일은 사용자 에러, 나머지는 모두 opaque 500
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => {
                ApiError::ValidationError("Email already registered".to_string())
            }
            other => ApiError::StorageError(other.to_string()),
        }
    }
}

/// 잘못된 JSON body → 400
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// 클라이언트(SessionController) 측 에러
///
/// 폴링 중 Transport 에러는 backoff 후 재시도, connect/disconnect/task 중에는
/// UI 컨트롤을 원래 상태로 되돌리고 재시도하지 않음
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected acknowledgement: {0}")]
    UnexpectedAck(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::ValidationError("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::AuthError, StatusCode::UNAUTHORIZED),
            (ApiError::NotFound("User".into()), StatusCode::NOT_FOUND),
            (ApiError::StorageError("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_duplicate_email_is_validation_error() {
        let err: ApiError = StoreError::DuplicateEmail.into();
        assert!(matches!(err, ApiError::ValidationError(ref m) if m == "Email already registered"));

        let err: ApiError = StoreError::Backend("boom".into()).into();
        assert!(matches!(err, ApiError::StorageError(_)));
    }

    #[tokio::test]
    async fn test_storage_error_body_is_opaque() {
        let err: ApiError = StoreError::Backend("connection refused at 10.0.0.5".into()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "STORAGE_ERROR");
        assert_eq!(body["error"], "Database error");
    }
}
