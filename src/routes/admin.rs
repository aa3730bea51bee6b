//! Admin Endpoints
//!
//! 전체 row dump. 인증 없음 (운영 환경에서는 앞단에서 막아야 함)

use axum::{extract::State, Json};

use crate::{
    db::{Account, TelemetrySample},
    error::ApiError,
    AppState,
};

/// GET /api/admin/users
///
/// password 컬럼은 직렬화에서 제외됨
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<Account>>, ApiError> {
    Ok(Json(state.accounts.all_accounts().await?))
}

/// GET /api/admin/bandwidth
pub async fn list_bandwidth(
    State(state): State<AppState>,
) -> Result<Json<Vec<TelemetrySample>>, ApiError> {
    Ok(Json(state.accounts.all_telemetry().await?))
}
