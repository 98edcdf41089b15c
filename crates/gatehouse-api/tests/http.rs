use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use gatehouse_api::AppStateInner;
use gatehouse_api::facade::DeviceFacade;
use gatehouse_api::routes;
use gatehouse_db::Database;
use gatehouse_lifecycle::{Lifecycle, LifecyclePolicy, ManualClock};

const AID: &str = "AID1234567890";

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
}

fn app() -> TestApp {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap(),
    ));
    let lifecycle = Arc::new(Lifecycle::new(
        Arc::new(Database::open_in_memory().unwrap()),
        clock.clone(),
        LifecyclePolicy::default(),
    ));
    let state = Arc::new(AppStateInner::new(DeviceFacade::new(lifecycle)));
    TestApp {
        router: routes::router(state),
        clock,
    }
}

impl TestApp {
    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn register(&self, android_id: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/api/v1/devices/register",
            Some(json!({ "email": "user@example.com", "androidId": android_id })),
        )
        .await
    }

    async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PATCH, uri, Some(body)).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, None).await
    }
}

#[tokio::test]
async fn health_reports_running() {
    let app = app();
    let (status, body) = app.get("/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn register_returns_created_pending_device() {
    let app = app();
    let (status, body) = app.register(AID).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Device registered successfully");
    assert_eq!(body["data"]["androidId"], AID);
    assert_eq!(body["data"]["isApproved"], false);
    assert!(body["data"]["expiresAt"].is_null());
}

#[tokio::test]
async fn duplicate_registration_is_bad_request() {
    let app = app();
    app.register(AID).await;

    let (status, body) = app.register(AID).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let app = app();

    let (status, _) = app.register("short").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/devices/register",
            Some(json!({ "email": "not-an-email", "androidId": AID })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.register(AID).await;
    app.patch(&format!("/api/v1/devices/{AID}/approve"), json!({})).await;
    let (status, _) = app
        .patch(
            &format!("/api/v1/devices/{AID}/extend"),
            json!({ "additionalDays": 400 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn approve_then_check_status() {
    let app = app();
    app.register(AID).await;

    let (status, body) = app
        .patch(
            &format!("/api/v1/devices/{AID}/approve"),
            json!({ "actionBy": "ops" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isApproved"], true);
    assert!(body["data"]["expiresAt"].is_string());

    let (status, body) = app.get(&format!("/api/v1/devices/{AID}/approved")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isApproved"], true);

    let (status, body) = app.get(&format!("/api/v1/devices/{AID}/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isApproved"], true);
    assert_eq!(body["data"]["email"], "user@example.com");

    let (_, body) = app.get(&format!("/api/v1/devices/{AID}/history")).await;
    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1]["action"], "approved");
    assert_eq!(history[1]["actionBy"], "ops");
}

#[tokio::test]
async fn expired_device_is_disabled_on_check() {
    let app = app();
    app.register(AID).await;
    app.patch(&format!("/api/v1/devices/{AID}/approve"), json!({}))
        .await;
    app.clock.advance(Duration::days(3) + Duration::seconds(1));

    let (status, body) = app.get(&format!("/api/v1/devices/{AID}/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isApproved"], false);

    let (status, _) = app.get(&format!("/api/v1/devices/{AID}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/api/v1/devices/disabled").await;
    let disabled = body["data"].as_array().unwrap();
    assert_eq!(disabled.len(), 1);
    assert_eq!(disabled[0]["disabledBy"], "system");

    let (status, body) = app.get(&format!("/api/v1/devices/{AID}/approved")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["isApproved"], false);
}

#[tokio::test]
async fn process_expired_sweeps_due_devices() {
    let app = app();
    app.register(AID).await;
    app.patch(&format!("/api/v1/devices/{AID}/approve"), json!({}))
        .await;
    app.register("AID0000000001").await;

    app.clock.advance(Duration::days(4));

    let (status, body) = app
        .call(Method::POST, "/api/v1/devices/process-expired", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let outcomes = body["data"].as_array().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0]["androidId"], AID);
    assert_eq!(outcomes[0]["status"], "disabled");

    let (_, body) = app.get("/api/v1/devices").await;
    let active = body["data"].as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["androidId"], "AID0000000001");
}

#[tokio::test]
async fn reject_and_reapprove_flows() {
    let app = app();
    app.register(AID).await;
    app.register("AID0000000002").await;

    let (status, _) = app
        .patch(
            &format!("/api/v1/devices/{AID}/reject"),
            json!({ "notes": "unknown owner" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/api/v1/devices/rejected").await;
    assert_eq!(body["data"][0]["rejectionReason"], "unknown owner");

    let (status, _) = app.register(AID).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Disabled devices can come back, rejected ones cannot
    let (status, _) = app
        .patch(
            &format!("/api/v1/devices/disabled/{AID}/approve"),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.patch("/api/v1/devices/AID0000000002/disable", json!({}))
        .await;
    let (status, body) = app
        .patch("/api/v1/devices/disabled/AID0000000002/approve", json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isApproved"], true);

    let (_, body) = app.get("/api/v1/devices/disabled").await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn extend_requires_approval() {
    let app = app();
    app.register(AID).await;

    let (status, _) = app
        .patch(&format!("/api/v1/devices/{AID}/extend"), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, approved) = app
        .patch(&format!("/api/v1/devices/{AID}/approve"), json!({}))
        .await;
    let (status, extended) = app
        .patch(
            &format!("/api/v1/devices/{AID}/extend"),
            json!({ "additionalDays": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(extended["message"], "Device approval extended by 2 days");
    assert_ne!(extended["data"]["expiresAt"], approved["data"]["expiresAt"]);
}

#[tokio::test]
async fn unknown_device_lookups_are_not_found() {
    let app = app();

    for uri in [
        "/api/v1/devices/AID9999999999",
        "/api/v1/devices/AID9999999999/status",
        "/api/v1/devices/AID9999999999/history",
    ] {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["success"], false);
    }

    let (status, _) = app
        .patch("/api/v1/devices/AID9999999999/approve", json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn action_body_is_optional() {
    let app = app();
    app.register(AID).await;

    let (status, body) = app
        .call(Method::PATCH, &format!("/api/v1/devices/{AID}/approve"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isApproved"], true);

    let (_, body) = app.get(&format!("/api/v1/devices/{AID}/history")).await;
    assert_eq!(body["data"][1]["actionBy"], "admin");
    assert_eq!(body["data"][1]["notes"], "Device approved for 3 days");
}

#[tokio::test]
async fn unreadable_bodies_answer_in_the_error_envelope() {
    let app = app();
    app.register(AID).await;
    app.patch(&format!("/api/v1/devices/{AID}/approve"), json!({}))
        .await;

    let cases = [
        (
            Method::POST,
            "/api/v1/devices/register".to_string(),
            json!({ "androidId": AID }),
        ),
        (
            Method::POST,
            "/api/v1/devices/register".to_string(),
            json!({ "email": "user@example.com", "androidId": AID, "role": "admin" }),
        ),
        (
            Method::PATCH,
            format!("/api/v1/devices/{AID}/extend"),
            json!({ "additionalDays": -1 }),
        ),
        (
            Method::PATCH,
            format!("/api/v1/devices/{AID}/disable"),
            json!({ "actionBy": 42 }),
        ),
    ];

    for (method, uri, body) in cases {
        let (status, response) = app.call(method, &uri, Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {body}");
        assert_eq!(response["success"], false);
        assert!(response["message"].is_string());
    }

    // Nothing above reached the engine
    let (status, body) = app.get(&format!("/api/v1/devices/{AID}/approved")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isApproved"], true);
}

#[tokio::test]
async fn broken_json_is_bad_request() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/devices/register")
        .header("content-type", "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}
