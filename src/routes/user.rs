//! User Endpoints
//!
//! Read path + the three write paths the client uses while sharing:
//!
//! - `GET  /api/user/:userId`            profile, 7-day history, referrals
//! - `POST /api/user/:userId/update`     full snapshot, last-writer-wins
//! - `POST /api/user/:userId/referral`   append one referral credit
//! - `POST /api/user/:userId/bandwidth`  append one telemetry sample

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use crate::{
    error::ApiError,
    types::{Ack, ReferralRequest, SyncSnapshot, TelemetryReport, UserProfile},
    AppState,
};

// ============ Handlers ============

/// GET /api/user/:userId
///
/// # Response
///
/// ```json
/// {
///   "user": { "userId": "user_...", "earnings": 12.5, "bandwidthShared": 310.2, ... },
///   "earningsHistory": [0, 0, 1.2, 0.4, 0, 2.1, 0.75],
///   "referrals": [{ "referralId": "ref_...", "earnings": 5, "createdAt": "..." }]
/// }
/// ```
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.accounts.profile(&user_id).await?;
    Ok(Json(profile))
}

/// POST /api/user/:userId/update
///
/// earningsHistory는 길이가 정확히 7일 때만 반영, 그 외에는 조용히 무시
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<SyncSnapshot>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Json(snapshot) = payload?;
    state.accounts.sync(&user_id, snapshot).await?;
    Ok(Json(Ack::ok()))
}

/// POST /api/user/:userId/referral
pub async fn add_referral(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<ReferralRequest>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Json(req) = payload?;
    state.accounts.add_referral(&user_id, req.earnings).await?;
    Ok(Json(Ack::ok()))
}

/// POST /api/user/:userId/bandwidth
pub async fn add_bandwidth(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<TelemetryReport>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Json(report) = payload?;
    state.accounts.add_telemetry(&user_id, report).await?;
    Ok(Json(Ack::ok()))
}
