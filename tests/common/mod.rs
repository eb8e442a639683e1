#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};

use portal_gate::authz::{Gatekeeper, PolicyTable, RouteMatcher};
use portal_gate::config::GatewayConfig;
use portal_gate::errors::{AppError, AppResult};
use portal_gate::identity::{CookieBag, IdentityProvider};
use portal_gate::models::{Profile, Session};
use portal_gate::profiles::ProfileStore;
use portal_gate::AppState;

pub const TOKEN: &str = "header.payload.signature";

pub fn session(email: &str) -> Session {
    Session::new(email, TOKEN, Utc::now() + ChronoDuration::hours(1))
}

pub enum IdentityBehavior {
    Returns(Option<Session>),
    Fails,
    Hangs,
}

pub struct StubIdentity {
    behavior: IdentityBehavior,
    pub calls: AtomicUsize,
}

impl StubIdentity {
    pub fn with_session(email: &str) -> Arc<Self> {
        Self::new(IdentityBehavior::Returns(Some(session(email))))
    }

    pub fn anonymous() -> Arc<Self> {
        Self::new(IdentityBehavior::Returns(None))
    }

    pub fn failing() -> Arc<Self> {
        Self::new(IdentityBehavior::Fails)
    }

    pub fn hanging() -> Arc<Self> {
        Self::new(IdentityBehavior::Hangs)
    }

    pub fn new(behavior: IdentityBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn get_session(&self, _cookies: &CookieBag) -> AppResult<Option<Session>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            IdentityBehavior::Returns(session) => Ok(session.clone()),
            IdentityBehavior::Fails => Err(AppError::upstream("connection reset by identity provider")),
            IdentityBehavior::Hangs => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
        }
    }
}

pub struct StubProfiles {
    profiles: HashMap<String, Profile>,
    fail: bool,
    pub calls: AtomicUsize,
}

impl StubProfiles {
    pub fn empty() -> Arc<Self> {
        Self::with(Vec::new())
    }

    pub fn with(profiles: Vec<Profile>) -> Arc<Self> {
        Arc::new(Self {
            profiles: profiles.into_iter().map(|p| (p.email.clone(), p)).collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            profiles: HashMap::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn single(email: &str, role: Option<&str>) -> Arc<Self> {
        let mut profile = Profile::new(email);
        profile.role = role.map(String::from);
        Self::with(vec![profile])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileStore for StubProfiles {
    async fn get_profile_by_email(&self, email: &str) -> AppResult<Option<Profile>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::upstream("profile store unavailable"));
        }
        Ok(self.profiles.get(email).cloned())
    }
}

pub fn gatekeeper(identity: Arc<StubIdentity>, profiles: Arc<StubProfiles>) -> Gatekeeper {
    let matcher = RouteMatcher::new(["/dashboard", "/onboarding"]).expect("matcher");
    Gatekeeper::new(identity, profiles, Arc::new(PolicyTable::builtin()), Arc::new(matcher))
        .with_timeout(Duration::from_millis(200))
}

pub fn state(
    config: GatewayConfig,
    identity: Arc<StubIdentity>,
    profiles: Arc<StubProfiles>,
) -> AppState {
    AppState::new(config, identity, profiles).expect("state")
}

/// One request as seen by the mock upstream.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedCall {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    }
}

#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("recorder lock").clone()
    }
}

/// Mock backend API and page frontend on an ephemeral port.
pub struct MockUpstream {
    pub addr: SocketAddr,
    pub recorder: Recorder,
}

impl MockUpstream {
    pub async fn start() -> anyhow::Result<Self> {
        let recorder = Recorder::default();
        let app = Router::new().fallback(respond).with_state(recorder.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app.into_make_service()).await;
        });

        Ok(Self { addr, recorder })
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }
}

async fn respond(State(recorder): State<Recorder>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let call = RecordedCall {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(String::from),
        headers: headers.clone(),
        body: body.clone(),
    };
    recorder.calls.lock().expect("recorder lock").push(call);

    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(String::from);

    match (method, uri.path()) {
        (Method::GET, "/api/v1/bookings") => (StatusCode::OK, Json(json!({"bookings": [{"id": 1}]}))).into_response(),
        (Method::POST, "/api/v1/bookings") => {
            let received: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
            (StatusCode::CREATED, Json(json!({"success": true, "received": received}))).into_response()
        }
        (Method::GET, "/api/v1/listings") => (StatusCode::NOT_FOUND, Json(json!({"foo": 1}))).into_response(),
        (Method::GET, "/api/v1/availability") => (StatusCode::OK, "<html>not json</html>").into_response(),
        (Method::POST, "/api/v1/availability") => StatusCode::NO_CONTENT.into_response(),
        (_, path) if path.starts_with("/dashboard") || path.starts_with("/onboarding") => (
            StatusCode::OK,
            Json(json!({
                "page": path,
                "query": uri.query(),
                "authorization": header("authorization"),
                "role": header("x-portal-role"),
                "email": header("x-portal-email"),
            })),
        )
            .into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({"error": "unknown mock route"}))).into_response(),
    }
}

/// Address nothing listens on, for transport failures.
pub async fn closed_url() -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{}", addr))
}

pub async fn body_json(response: Response) -> anyhow::Result<Value> {
    let bytes = axum::body::to_bytes(response.into_body(), 10_485_760).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
