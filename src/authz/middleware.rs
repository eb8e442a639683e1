use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use super::evaluator::Decision;
use crate::app::AppState;
use crate::errors::AppError;
use crate::identity::CookieBag;

/// Axum middleware wrapping every route. Paths outside the protected
/// matcher pass straight through; non-canonical paths get a 400.
pub async fn authorize_request(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let cookies = CookieBag::from_headers(request.headers());

    match state.gatekeeper.authorize(&path, &cookies).await {
        Decision::Bypass => next.run(request).await,
        Decision::Forward(forward) => {
            forward.credentials.apply(request.headers_mut());
            request.extensions_mut().insert(forward.principal);
            next.run(request).await
        }
        Decision::Redirect(redirect) => {
            tracing::info!(
                path = %path,
                location = %redirect.location,
                reason = redirect.reason.as_str(),
                "redirecting request"
            );
            Redirect::temporary(&redirect.location).into_response()
        }
        Decision::Reject { path } => {
            tracing::info!(path = %path, "rejecting non-canonical path");
            AppError::bad_request("request path must not contain dot segments, empty segments or encoded separators")
                .into_response()
        }
    }
}
