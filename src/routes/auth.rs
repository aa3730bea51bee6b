//! Registration / Login Endpoints
//!
//! 세션 토큰 없음. 로그인 응답의 userId를 클라이언트가 보관하고
//! `/api/user/:userId/*` 호출에 사용

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::{
    error::ApiError,
    types::{AuthResponse, LoginRequest, RegisterRequest},
    AppState,
};

/// POST /api/register
///
/// # Request
///
/// ```json
/// { "name": "A", "email": "a@x.com", "password": "password1" }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "success": true,
///   "user": { "email": "a@x.com", "name": "A", "userId": "user_...",
///             "referralCode": "DUB-7K2Q-M9XA", "isAdmin": false }
/// }
/// ```
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(req) = payload?;
    let account = state.accounts.register(req).await?;

    Ok(Json(AuthResponse {
        success: true,
        user: account.registered_user(),
    }))
}

/// POST /api/login
///
/// 실패 사유(없는 이메일 / 비밀번호 불일치)는 구분하지 않음
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(req) = payload?;
    let account = state.accounts.login(req).await?;

    tracing::info!(user_id = %account.user_id, "Login");

    Ok(Json(AuthResponse {
        success: true,
        user: account.logged_in_user(),
    }))
}
