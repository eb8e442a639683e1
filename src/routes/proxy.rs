use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{on, MethodFilter};
use axum::Router;
use serde_json::Value;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::models::ProxyEnvelope;
use crate::upstream::BackendReply;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMethod {
    Get,
    Post,
}

impl ProxyMethod {
    pub fn method(&self) -> Method {
        match self {
            ProxyMethod::Get => Method::GET,
            ProxyMethod::Post => Method::POST,
        }
    }

    fn filter(&self) -> MethodFilter {
        match self {
            ProxyMethod::Get => MethodFilter::GET,
            ProxyMethod::Post => MethodFilter::POST,
        }
    }

    /// Write methods carry the caller's JSON body to the backend.
    pub fn carries_body(&self) -> bool {
        matches!(self, ProxyMethod::Post)
    }
}

/// One same-origin relay endpoint bound to a fixed backend path.
#[derive(Debug, Clone, Copy)]
pub struct ProxyRoute {
    pub method: ProxyMethod,
    pub local_path: &'static str,
    pub backend_path: &'static str,
    pub failure_message: &'static str,
    pub fallback_message: Option<&'static str>,
}

pub const PROXY_ROUTES: &[ProxyRoute] = &[
    ProxyRoute {
        method: ProxyMethod::Get,
        local_path: "/api/bookings",
        backend_path: "/api/v1/bookings",
        failure_message: "Failed to fetch bookings",
        fallback_message: None,
    },
    ProxyRoute {
        method: ProxyMethod::Post,
        local_path: "/api/bookings",
        backend_path: "/api/v1/bookings",
        failure_message: "Failed to create booking",
        fallback_message: None,
    },
    ProxyRoute {
        method: ProxyMethod::Get,
        local_path: "/api/availability",
        backend_path: "/api/v1/availability",
        failure_message: "Failed to fetch availability",
        fallback_message: None,
    },
    ProxyRoute {
        method: ProxyMethod::Post,
        local_path: "/api/availability",
        backend_path: "/api/v1/availability",
        failure_message: "Failed to update availability",
        fallback_message: None,
    },
    ProxyRoute {
        method: ProxyMethod::Get,
        local_path: "/api/listings",
        backend_path: "/api/v1/listings",
        failure_message: "Failed to fetch listings",
        fallback_message: None,
    },
    ProxyRoute {
        method: ProxyMethod::Post,
        local_path: "/api/resume/analyze",
        backend_path: "/api/v1/ai/resume/analyze",
        failure_message: "Failed to analyze resume",
        fallback_message: Some("Resume analysis is temporarily unavailable. Your resume was not lost; please try again in a few minutes."),
    },
];

pub fn router() -> Router<AppState> {
    PROXY_ROUTES.iter().fold(Router::new(), |router, route| {
        let handler = move |State(state): State<AppState>, headers: HeaderMap, RawQuery(query): RawQuery, body: Bytes| async move {
            relay(&state, route, &headers, query.as_deref(), body).await
        };
        router.route(route.local_path, on(route.method.filter(), handler))
    })
}

/// Forwards one call for `route`, rendering every failure as a JSON envelope.
pub async fn relay(state: &AppState, route: &ProxyRoute, headers: &HeaderMap, query: Option<&str>, body: Bytes) -> Response {
    let Some(authorization) = headers.get(AUTHORIZATION).filter(|value| !value.is_empty()) else {
        tracing::debug!(route = route.local_path, has_authorization = false, "proxy call rejected");
        return ProxyEnvelope::missing_authorization().into_response_with(StatusCode::UNAUTHORIZED);
    };

    tracing::debug!(
        route = route.local_path,
        backend_path = route.backend_path,
        has_authorization = true,
        "relaying to backend"
    );

    let outcome: AppResult<BackendReply> = async {
        let payload = if route.method.carries_body() { parse_body(&body)? } else { None };
        state
            .backend
            .forward(route.method.method(), route.backend_path, query, authorization, payload)
            .await
    }
    .await;

    match outcome {
        Ok(reply) => reply.into_response(),
        Err(err) => {
            tracing::warn!(route = route.local_path, error = %err, kind = err.kind(), "proxy call failed");
            ProxyEnvelope::failure(route.failure_message)
                .with_error(err.to_string())
                .with_fallback(route.fallback_message)
                .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn parse_body(body: &Bytes) -> AppResult<Option<Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(body)
        .map(Some)
        .map_err(|err| AppError::bad_request(format!("request body is not valid JSON: {err}")))
}
