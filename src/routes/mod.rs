//! API Routes Module
//!
//! 모든 HTTP 엔드포인트 정의
//!
//! # Routes
//! - `/health` - 헬스 체크
//! - `/api/register`, `/api/login` - 계정
//! - `/api/user/:userId/*` - 프로필 조회 / sync / referral / 텔레메트리
//! - `/api/admin/*` - 전체 row dump

pub mod admin;
pub mod auth;
pub mod health;
pub mod user;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// 라우터 생성
///
/// # Route Structure
///
/// ```text
/// GET  /health                       - 서버 상태 확인
///
/// POST /api/register                 - 회원가입
/// POST /api/login                    - 로그인
///
/// GET  /api/user/:userId             - 프로필 + history + referral
/// POST /api/user/:userId/update      - snapshot sync
/// POST /api/user/:userId/referral    - referral credit 추가
/// POST /api/user/:userId/bandwidth   - 텔레메트리 샘플 추가
///
/// GET  /api/admin/users              - 전체 계정
/// GET  /api/admin/bandwidth          - 전체 텔레메트리
/// ```
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))

        // Auth
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))

        // User
        .route("/api/user/:userId", get(user::get_user))
        .route("/api/user/:userId/update", post(user::update_user))
        .route("/api/user/:userId/referral", post(user::add_referral))
        .route("/api/user/:userId/bandwidth", post(user::add_bandwidth))

        // Admin
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/bandwidth", get(admin::list_bandwidth))

        // 미들웨어
        .layer(TraceLayer::new_for_http())
        .layer(cors)

        // 상태 주입
        .with_state(state)
}

/// CORS 설정
///
/// 프로덕션: ALLOWED_ORIGINS만 허용, 개발: 전부 허용 (브라우저 확장 / 데스크톱 앱)
fn cors_layer(state: &AppState) -> CorsLayer {
    if state.config.is_production() {
        let origins: Vec<HeaderValue> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        if origins.is_empty() {
            tracing::warn!("ALLOWED_ORIGINS is empty, cross-origin requests will be rejected");
        }
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
