use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::app::AppState;
use crate::errors::AppError;
use crate::identity::CookieBag;
use crate::models::{Profile, RoleKey, Session};

/// The caller as resolved by the middleware: session, profile (if one
/// exists yet) and the role used for policy evaluation.
///
/// Forwarded requests carry it in their extensions so handlers further down
/// the same request never repeat the collaborator round trips.
#[derive(Debug, Clone)]
pub struct Principal {
    pub session: Session,
    pub profile: Option<Profile>,
    pub role: RoleKey,
}

impl Principal {
    pub fn new(session: Session, profile: Option<Profile>) -> Self {
        let role = profile
            .as_ref()
            .map(Profile::effective_role)
            .unwrap_or(RoleKey::Onboarding);

        Self {
            session,
            profile,
            role,
        }
    }

    pub fn email(&self) -> &str {
        &self.session.email
    }
}

/// Session of the caller, taken from the middleware's `Principal` when the
/// request already went through it, otherwise resolved from the cookies.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(CurrentSession(principal.session.clone()));
        }

        let cookies = CookieBag::from_headers(&parts.headers);
        let session = state
            .gatekeeper
            .resolve_session(&cookies)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, kind = err.kind(), "session lookup failed");
                AppError::unauthorized("no active session")
            })?
            .ok_or_else(|| AppError::unauthorized("no active session"))?;

        Ok(CurrentSession(session))
    }
}
