mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::json;
use tower::util::ServiceExt; // for `oneshot`

use portal_gate::config::GatewayConfig;
use portal_gate::create_app;

use common::{body_json, closed_url, state, MockUpstream, StubIdentity, StubProfiles};

const BEARER: &str = "Bearer caller-token";

fn app_for(backend: &str) -> Router {
    // proxy routes never consult the collaborators
    create_app(state(GatewayConfig::new(backend), StubIdentity::failing(), StubProfiles::failing()))
}

fn call(method: &str, uri: &str, body: Option<&str>) -> Result<Request<Body>> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, BEARER)
        .header(header::CONTENT_TYPE, "application/json");
    Ok(builder.body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))?)
}

#[tokio::test]
async fn missing_authorization_is_rejected_before_the_backend() -> Result<()> {
    let upstream = MockUpstream::start().await?;
    let app = app_for(&upstream.url());

    let req = Request::builder()
        .method("GET")
        .uri("/api/bookings")
        .body(Body::empty())?;
    let resp = app.oneshot(req).await?;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await?;
    assert_eq!(body, json!({"success": false, "message": "Authorization header required"}));
    assert!(upstream.recorder.calls().is_empty());

    Ok(())
}

#[tokio::test]
async fn get_bookings_passes_backend_reply_through() -> Result<()> {
    let upstream = MockUpstream::start().await?;
    let app = app_for(&upstream.url());

    let resp = app.oneshot(call("GET", "/api/bookings", None)?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    assert_eq!(body_json(resp).await?, json!({"bookings": [{"id": 1}]}));

    let calls = upstream.recorder.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, "/api/v1/bookings");
    assert_eq!(calls[0].header("authorization").as_deref(), Some(BEARER));
    assert_eq!(calls[0].header("content-type").as_deref(), Some("application/json"));

    Ok(())
}

#[tokio::test]
async fn backend_error_status_is_not_rewritten() -> Result<()> {
    let upstream = MockUpstream::start().await?;
    let app = app_for(&upstream.url());

    let resp = app.oneshot(call("GET", "/api/listings", None)?).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await?, json!({"foo": 1}));

    Ok(())
}

#[tokio::test]
async fn post_body_is_forwarded_as_json() -> Result<()> {
    let upstream = MockUpstream::start().await?;
    let app = app_for(&upstream.url());

    let resp = app
        .oneshot(call("POST", "/api/bookings", Some(r#"{ "slot": "2026-10-20T09:00:00Z", "seats": 2 }"#))?)
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body = body_json(resp).await?;
    assert_eq!(body["received"], json!({"slot": "2026-10-20T09:00:00Z", "seats": 2}));

    let calls = upstream.recorder.calls();
    assert_eq!(calls[0].method, axum::http::Method::POST);
    assert_eq!(calls[0].path, "/api/v1/bookings");

    Ok(())
}

#[tokio::test]
async fn query_string_reaches_the_backend() -> Result<()> {
    let upstream = MockUpstream::start().await?;
    let app = app_for(&upstream.url());

    let resp = app.oneshot(call("GET", "/api/bookings?page=2&size=10", None)?).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let calls = upstream.recorder.calls();
    assert_eq!(calls[0].query.as_deref(), Some("page=2&size=10"));

    Ok(())
}

#[tokio::test]
async fn non_json_backend_reply_becomes_failure_envelope() -> Result<()> {
    let upstream = MockUpstream::start().await?;
    let app = app_for(&upstream.url());

    let resp = app.oneshot(call("GET", "/api/availability", None)?).await?;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(resp).await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Failed to fetch availability");
    assert!(body["error"].is_string());
    assert!(body.get("fallbackMessage").is_none());

    Ok(())
}

#[tokio::test]
async fn empty_backend_reply_keeps_its_status() -> Result<()> {
    let upstream = MockUpstream::start().await?;
    let app = app_for(&upstream.url());

    let resp = app.oneshot(call("POST", "/api/availability", Some(r#"{"open": true}"#))?).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    Ok(())
}

#[tokio::test]
async fn unreachable_backend_carries_fallback_message() -> Result<()> {
    let backend = closed_url().await?;
    let app = app_for(&backend);

    let resp = app
        .oneshot(call("POST", "/api/resume/analyze", Some(r#"{"resume": "..."}"#))?)
        .await?;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(resp).await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Failed to analyze resume");
    assert!(body["error"].is_string());
    assert!(body["fallbackMessage"].as_str().is_some_and(|m| !m.is_empty()));

    Ok(())
}

#[tokio::test]
async fn malformed_request_body_never_reaches_the_backend() -> Result<()> {
    let upstream = MockUpstream::start().await?;
    let app = app_for(&upstream.url());

    let resp = app.oneshot(call("POST", "/api/bookings", Some("{not json"))?).await?;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(resp).await?;
    assert_eq!(body["message"], "Failed to create booking");
    assert!(upstream.recorder.calls().is_empty());

    Ok(())
}

#[tokio::test]
async fn unsupported_method_is_not_relayed() -> Result<()> {
    let upstream = MockUpstream::start().await?;
    let app = app_for(&upstream.url());

    let resp = app.oneshot(call("GET", "/api/resume/analyze", None)?).await?;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(upstream.recorder.calls().is_empty());

    Ok(())
}
