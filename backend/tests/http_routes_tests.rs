//! HTTP route tests driving the axum router in-process.

#![cfg(feature = "http-server")]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use assessment_access::clock::FixedClock;
use assessment_access::config::EngineConfig;
use assessment_access::db::repositories::LocalRepository;
use assessment_access::http::{create_router, AppState};
use assessment_access::models::ScheduleKey;
use assessment_access::services::PollingGateway;

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
}

struct TestApp {
    router: Router,
    repo: LocalRepository,
    clock: FixedClock,
}

impl TestApp {
    fn new() -> Self {
        let repo = LocalRepository::new();
        let clock = FixedClock::new(at(9, 0));
        let gateway = PollingGateway::new(
            Arc::new(repo.clone()),
            EngineConfig::default(),
            Arc::new(clock.clone()),
        );
        Self {
            router: create_router(AppState::new(gateway)),
            repo,
            clock,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn assign(&self, assessment: i64, student: i64, start: DateTime<Utc>) {
        let (status, _) = self
            .send(
                Method::PUT,
                &format!("/v1/windows/{}/{}", assessment, student),
                Some(json!({ "windowStart": start })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

fn reschedule_body(start: DateTime<Utc>, reason: &str) -> Value {
    json!({
        "scheduleKey": { "assessmentId": 1, "studentProfileId": 2 },
        "newWindowStart": start,
        "reason": reason,
        "teacherId": 9,
    })
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["repository"], "connected");
}

#[tokio::test]
async fn test_assign_and_get_window() {
    let app = TestApp::new();
    app.assign(1, 2, at(10, 0)).await;

    let (status, body) = app.send(Method::GET, "/v1/windows/1/2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scheduleKey"]["assessmentId"], 1);
    assert_eq!(body["scheduleKey"]["studentProfileId"], 2);
    assert_eq!(body["windowEnd"], json!(at(11, 0)));
    assert_eq!(body["graceEnd"], json!(at(11, 30)));
    assert_eq!(body["version"], 1);
}

#[tokio::test]
async fn test_assign_twice_is_conflict() {
    let app = TestApp::new();
    app.assign(1, 2, at(10, 0)).await;

    let (status, body) = app
        .send(
            Method::PUT,
            "/v1/windows/1/2",
            Some(json!({ "windowStart": at(12, 0) })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_EXISTS");
}

#[tokio::test]
async fn test_access_decision_shape() {
    let app = TestApp::new();
    app.assign(1, 2, at(10, 0)).await;
    app.clock.set(at(11, 15));

    let (status, body) = app.send(Method::GET, "/v1/access/1/2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "GRACE_PERIOD");
    assert_eq!(body["canAccess"], true);
    assert_eq!(body["gracePeriodActive"], true);
    assert_eq!(body["minutesRemaining"], 15);
    assert_eq!(body["rescheduled"], false);
    assert_eq!(body["currentTime"], json!(at(11, 15)));
}

#[tokio::test]
async fn test_access_after_submission() {
    let app = TestApp::new();
    app.assign(1, 2, at(10, 0)).await;
    app.repo.record_submission(ScheduleKey::new(1, 2));

    let (_, body) = app.send(Method::GET, "/v1/access/1/2", None).await;
    assert_eq!(body["alreadySubmitted"], true);
    assert_eq!(body["canAccess"], false);
    assert!(body.get("windowStart").is_none());
}

#[tokio::test]
async fn test_access_unknown_key_is_404() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/v1/access/5/5", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "WINDOW_NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_path_is_400() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/v1/access/abc/5", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_reschedule_and_cancel_over_http() {
    let app = TestApp::new();
    app.assign(1, 2, at(14, 0)).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/v1/reschedules",
            Some(reschedule_body(at(16, 0), "Student has a dentist appointment")),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["window"]["windowStart"], json!(at(16, 0)));
    assert_eq!(body["window"]["windowEnd"], json!(at(17, 0)));
    assert_eq!(body["window"]["graceEnd"], json!(at(17, 30)));
    assert_eq!(body["reschedule"]["status"], "ACTIVE");
    assert_eq!(body["reschedule"]["shiftMinutes"], 120);
    assert_eq!(body["warnings"], json!([]));
    let id = body["reschedule"]["id"].as_i64().unwrap();

    let (_, access) = app.send(Method::GET, "/v1/access/1/2", None).await;
    assert_eq!(access["rescheduled"], true);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/v1/reschedules/{}/cancel", id),
            Some(json!({ "reason": "Appointment moved" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELLED");
    assert_eq!(body["cancelledReason"], "Appointment moved");

    let (_, window) = app.send(Method::GET, "/v1/windows/1/2", None).await;
    assert_eq!(window["windowStart"], json!(at(14, 0)));

    let (status, body) = app
        .send(Method::POST, &format!("/v1/reschedules/{}/cancel", id), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NOT_CANCELLABLE");
}

#[tokio::test]
async fn test_invalid_reschedule_is_422_with_every_rule() {
    let app = TestApp::new();
    app.assign(1, 2, at(14, 0)).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/v1/reschedules",
            Some(reschedule_body(at(8, 0), "short")),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let rules: Vec<&str> = body["validation"]["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["rule"].as_str())
        .collect();
    assert!(rules.contains(&"INVALID_REASON"));
    assert!(rules.contains(&"PAST_START"));
    assert_eq!(app.repo.reschedule_count(), 0);
}

#[tokio::test]
async fn test_validate_endpoint_reports_warnings() {
    let app = TestApp::new();
    app.assign(1, 2, at(14, 0)).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/v1/reschedules/validate",
            Some(reschedule_body(at(9, 30), "Student has a dentist appointment")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["warnings"][0]["rule"], "SHORT_LEAD_TIME");
    assert_eq!(app.repo.reschedule_count(), 0);
}

#[tokio::test]
async fn test_malformed_reschedule_body_is_400() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Method::POST,
            "/v1/reschedules",
            Some(json!({ "reason": "missing everything else" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_listing_endpoints() {
    let app = TestApp::new();
    app.assign(1, 2, at(14, 0)).await;
    app.send(
        Method::POST,
        "/v1/reschedules",
        Some(reschedule_body(at(16, 0), "Student has a dentist appointment")),
    )
    .await;

    let (status, body) = app
        .send(Method::GET, "/v1/reschedules?teacherId=9", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (_, body) = app
        .send(Method::GET, "/v1/reschedules?teacherId=9&studentId=3", None)
        .await;
    assert_eq!(body["total"], 0);

    let (_, body) = app.send(Method::GET, "/v1/students/2/reschedules", None).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["reschedules"][0]["shiftDescription"], "+2 hours later");

    let (_, body) = app
        .send(Method::GET, "/v1/windows/1/2/reschedules", None)
        .await;
    assert_eq!(body["total"], 1);

    let (status, _) = app.send(Method::GET, "/v1/reschedules", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_unknown_reschedule_is_404() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/v1/reschedules/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_unhealthy_repository_is_503() {
    let app = TestApp::new();
    app.assign(1, 2, at(14, 0)).await;
    app.repo.set_healthy(false);

    let (status, body) = app.send(Method::GET, "/v1/access/1/2", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "REPOSITORY_ERROR");

    let (status, body) = app.send(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["repository"], "disconnected");
}
