use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use axum::Extension;

use crate::app::AppState;
use crate::authz::Principal;
use crate::models::ProxyEnvelope;

pub const ROLE_HEADER: &str = "x-portal-role";
pub const EMAIL_HEADER: &str = "x-portal-email";

/// Relays an authorized page request to the rendering frontend.
///
/// The middleware has already injected `Authorization`; the resolved role
/// and email travel along so the frontend does not repeat the lookups.
pub async fn relay(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
    method: Method,
    uri: Uri,
    mut headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Only pages the middleware evaluated and forwarded are relayed. A page
    // route outside PROTECTED_PREFIXES never gets a principal.
    let Some(Extension(principal)) = principal else {
        tracing::warn!(path = %uri.path(), "page route is not covered by the protected prefixes");
        return ProxyEnvelope::failure("Page is not behind the authorization gate")
            .into_response_with(StatusCode::FORBIDDEN);
    };

    let Some(frontend) = state.frontend.as_ref() else {
        return ProxyEnvelope::failure("Page rendering is not configured")
            .into_response_with(StatusCode::SERVICE_UNAVAILABLE);
    };

    // Never trust identity headers sent by the client.
    headers.remove(ROLE_HEADER);
    headers.remove(EMAIL_HEADER);
    set_header(&mut headers, ROLE_HEADER, principal.role.as_str());
    set_header(&mut headers, EMAIL_HEADER, principal.email());

    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    match frontend.relay(method, path_and_query, &headers, body).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(path = %uri.path(), error = %err, "page relay failed");
            ProxyEnvelope::failure("Failed to load page")
                .with_error(err.to_string())
                .into_response_with(StatusCode::BAD_GATEWAY)
        }
    }
}

fn set_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}
