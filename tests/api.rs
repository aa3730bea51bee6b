//! HTTP-level tests: the full router over an in-memory store.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tokio_test::assert_ok;
use tower::ServiceExt;

use dub_share_api::{
    config::Environment,
    db::MemoryStore,
    routes::create_router,
    services::{is_valid_referral_code, AccountService, RandomIds},
    AppState, Config,
};

fn test_config() -> Config {
    Config {
        port: 0,
        database_url: None,
        environment: Environment::Development,
        allowed_origins: vec![],
        admin_email: None,
        admin_password: None,
    }
}

fn test_app() -> (Router, Arc<AccountService>) {
    let accounts = AccountService::new(Arc::new(MemoryStore::new()), Arc::new(RandomIds));
    let state = AppState::new(accounts, test_config());
    let accounts = state.accounts.clone();
    (create_router(state), accounts)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn register(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/register",
        Some(json!({"name": "A", "email": email, "password": "password1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["user"]["userId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_register_then_duplicate_email() {
    let (app, _) = test_app();
    let request = json!({"name": "A", "email": "a@x.com", "password": "password1"});

    let (status, body) = send(&app, "POST", "/api/register", Some(request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["isAdmin"], false);
    assert_eq!(body["user"]["email"], "a@x.com");
    assert!(body["user"]["userId"].as_str().unwrap().starts_with("user_"));
    assert!(is_valid_referral_code(
        body["user"]["referralCode"].as_str().unwrap()
    ));
    assert!(body["user"].get("earnings").is_none());

    let (status, body) = send(&app, "POST", "/api/register", Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email already registered");
}

#[tokio::test]
async fn test_register_validation() {
    let (app, _) = test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/register",
        Some(json!({"name": "A", "email": "a@x.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please fill in all fields");

    let (status, body) = send(
        &app,
        "POST",
        "/api/register",
        Some(json!({"name": "A", "email": "a@x.com", "password": "short"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password must be at least 8 characters");
}

#[tokio::test]
async fn test_referral_codes_are_unique() {
    let (app, _) = test_app();
    let mut codes = std::collections::HashSet::new();

    for i in 0..20 {
        let (_, body) = send(
            &app,
            "POST",
            "/api/register",
            Some(json!({"name": "U", "email": format!("u{}@x.com", i), "password": "password1"})),
        )
        .await;
        codes.insert(body["user"]["referralCode"].as_str().unwrap().to_string());
    }

    assert_eq!(codes.len(), 20);
}

#[tokio::test]
async fn test_login() {
    let (app, _) = test_app();
    register(&app, "a@x.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/login",
        Some(json!({"email": "a@x.com", "password": "password1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["earnings"], 0.0);
    assert_eq!(body["user"]["dailyGoal"], 0);

    let (status, body) = send(
        &app,
        "POST",
        "/api/login",
        Some(json!({"email": "a@x.com", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");

    let (status, _) = send(
        &app,
        "POST",
        "/api/login",
        Some(json!({"email": "nobody@x.com", "password": "password1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_new_user_profile_is_zeroed() {
    let (app, _) = test_app();
    let user_id = register(&app, "a@x.com").await;

    let (status, body) = send(&app, "GET", &format!("/api/user/{}", user_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["earningsHistory"], json!([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
    assert_eq!(body["referrals"], json!([]));
    assert_eq!(body["user"]["earnings"], 0.0);
}

#[tokio::test]
async fn test_update_with_short_history_keeps_stored_history() {
    let (app, _) = test_app();
    let user_id = register(&app, "a@x.com").await;
    let uri = format!("/api/user/{}/update", user_id);

    let full = json!([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(json!({"earnings": 28.0, "bandwidthShared": 120.5, "earningsHistory": full, "dailyGoal": 10})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(json!({"earnings": 30.0, "bandwidthShared": 130.0, "earningsHistory": [1, 1, 1, 1, 1], "dailyGoal": 12})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, profile) = send(&app, "GET", &format!("/api/user/{}", user_id), None).await;
    assert_eq!(profile["earningsHistory"], full);
    // totals는 last-writer-wins
    assert_eq!(profile["user"]["earnings"], 30.0);
    assert_eq!(profile["user"]["bandwidthShared"], 130.0);
    assert_eq!(profile["user"]["dailyGoal"], 12);
    assert!(profile["user"]["lastActive"].is_string());
}

#[tokio::test]
async fn test_update_accepts_daily_goal_above_u32() {
    let (app, _) = test_app();
    let user_id = register(&app, "a@x.com").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/user/{}/update", user_id),
        Some(json!({"earnings": 1, "bandwidthShared": 1, "dailyGoal": 5_000_000_000i64})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, profile) = send(&app, "GET", &format!("/api/user/{}", user_id), None).await;
    assert_eq!(profile["user"]["dailyGoal"], 5_000_000_000i64);
}

#[tokio::test]
async fn test_update_rejects_negative_amounts_and_bad_json() {
    let (app, _) = test_app();
    let user_id = register(&app, "a@x.com").await;
    let uri = format!("/api/user/{}/update", user_id);

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(json!({"earnings": -1.0, "bandwidthShared": 0.0, "dailyGoal": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(json!({"earnings": 1.0, "bandwidthShared": 0.0, "dailyGoal": -3})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", &uri, Some(json!({"earnings": "lots"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let (app, _) = test_app();

    let (status, body) = send(&app, "GET", "/api/user/user_missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");

    let (status, _) = send(
        &app,
        "POST",
        "/api/user/user_missing/update",
        Some(json!({"earnings": 1.0, "bandwidthShared": 1.0, "dailyGoal": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/api/user/user_missing/referral",
        Some(json!({"earnings": 1.0})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/api/user/user_missing/bandwidth",
        Some(json!({"timestamp": "2024-03-01T10:00:00Z", "speedMbps": 1.0, "durationSeconds": 30.0, "bandwidthMB": 3.75})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_referrals_are_appended() {
    let (app, _) = test_app();
    let user_id = register(&app, "a@x.com").await;
    let uri = format!("/api/user/{}/referral", user_id);

    for amount in [5.0, 2.5, 5.0] {
        let (status, body) = send(&app, "POST", &uri, Some(json!({"earnings": amount}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    let (_, profile) = send(&app, "GET", &format!("/api/user/{}", user_id), None).await;
    let referrals = profile["referrals"].as_array().unwrap();
    assert_eq!(referrals.len(), 3);
    let amounts: Vec<f64> = referrals
        .iter()
        .map(|r| r["earnings"].as_f64().unwrap())
        .collect();
    assert_eq!(amounts, vec![5.0, 2.5, 5.0]);
    assert!(referrals
        .iter()
        .all(|r| r["referralId"].as_str().unwrap().starts_with("ref_")));

    // 추천 수익은 누적 earnings에 합산되지 않음
    assert_eq!(profile["user"]["earnings"], 0.0);
}

#[tokio::test]
async fn test_bandwidth_samples_and_admin_dumps() {
    let (app, accounts) = test_app();
    let user_id = register(&app, "a@x.com").await;
    assert_ok!(accounts.ensure_admin("admin@dub.dev", "adminpass").await);

    let sample = json!({
        "timestamp": "2024-03-01T10:00:00Z",
        "speedMbps": 0.5,
        "durationSeconds": 32.0,
        "bandwidthMB": 2.0
    });
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/user/{}/bandwidth", user_id),
        Some(sample),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, users) = send(&app, "GET", "/api/admin/users", None).await;
    assert_eq!(status, StatusCode::OK);
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("password").is_none()));
    assert!(users.iter().any(|u| u["isAdmin"] == true));

    let (status, samples) = send(&app, "GET", "/api/admin/bandwidth", None).await;
    assert_eq!(status, StatusCode::OK);
    let samples = samples.as_array().unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0]["bandwidthMB"], 2.0);
    assert_eq!(samples[0]["speedMbps"], 0.5);
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["connected"], true);
}
