use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderValue};

use super::matcher::{is_canonical_path, RouteMatcher};
use super::policy::{Access, PolicyTable};
use super::principal::Principal;
use super::{LOGIN_PATH, ONBOARDING_PATH};
use crate::errors::{AppError, AppResult};
use crate::identity::{CookieBag, IdentityProvider};
use crate::models::{RoleKey, Session};
use crate::profiles::ProfileStore;
use crate::utils::utc_now;

const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a request was redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    /// No session for the request cookies.
    Unauthenticated,
    /// A collaborator failed or timed out; treated as unauthenticated.
    CollaboratorFailure,
    /// No profile or no role assigned yet.
    NeedsOnboarding,
    /// The role's allow-list does not cover the path.
    Denied,
}

impl RedirectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectReason::Unauthenticated => "unauthenticated",
            RedirectReason::CollaboratorFailure => "collaborator_failure",
            RedirectReason::NeedsOnboarding => "needs_onboarding",
            RedirectReason::Denied => "denied",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTo {
    pub location: String,
    pub reason: RedirectReason,
}

/// Headers to add to a forwarded request. Applying them twice is harmless.
#[derive(Debug, Clone, Default)]
pub struct ForwardedCredentials {
    headers: HeaderMap,
}

impl ForwardedCredentials {
    pub fn for_session(session: &Session) -> AppResult<Self> {
        let mut value = HeaderValue::from_str(&session.bearer())
            .map_err(|_| AppError::token("session token is not a valid header value"))?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(Self { headers })
    }

    pub fn authorization(&self) -> Option<&HeaderValue> {
        self.headers.get(AUTHORIZATION)
    }

    pub fn apply(&self, target: &mut HeaderMap) {
        for (name, value) in &self.headers {
            target.insert(name.clone(), value.clone());
        }
    }
}

#[derive(Debug, Clone)]
pub struct Forward {
    pub principal: Principal,
    pub credentials: ForwardedCredentials,
}

/// Terminal outcome of one middleware evaluation.
#[derive(Debug, Clone)]
pub enum Decision {
    Bypass,
    Forward(Box<Forward>),
    Redirect(RedirectTo),
    /// Path the policy cannot be checked against, answered with 400.
    Reject { path: String },
}

impl Decision {
    fn redirect(location: impl Into<String>, reason: RedirectReason) -> Self {
        Decision::Redirect(RedirectTo {
            location: location.into(),
            reason,
        })
    }

    pub fn redirect_location(&self) -> Option<&str> {
        match self {
            Decision::Redirect(redirect) => Some(&redirect.location),
            _ => None,
        }
    }

    pub fn is_forward(&self) -> bool {
        matches!(self, Decision::Forward(_))
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, Decision::Reject { .. })
    }
}

/// The policy-enforcement point: resolves the caller through the
/// collaborators and checks the path against the policy table.
///
/// Evaluation order:
/// 0. dot segments, empty segments or encoded separators -> reject
/// 1. public or unprotected path -> bypass
/// 2. no session -> `/login`
/// 3. no profile or no role -> onboarding pseudo-role
/// 4. allowed prefix -> forward with bearer credential
/// 5. otherwise -> role home
///
/// Any collaborator error or timeout ends in `/login`.
#[derive(Clone)]
pub struct Gatekeeper {
    identity: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    policy: Arc<PolicyTable>,
    matcher: Arc<RouteMatcher>,
    timeout: Duration,
}

impl Gatekeeper {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        policy: Arc<PolicyTable>,
        matcher: Arc<RouteMatcher>,
    ) -> Self {
        Self {
            identity,
            profiles,
            policy,
            matcher,
            timeout: DEFAULT_COLLABORATOR_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn profiles(&self) -> &Arc<dyn ProfileStore> {
        &self.profiles
    }

    pub async fn authorize(&self, path: &str, cookies: &CookieBag) -> Decision {
        // Downstream URL parsers resolve these, so the prefix check would
        // judge a different path than the one relayed.
        if !is_canonical_path(path) {
            return Decision::Reject { path: path.to_string() };
        }

        if !self.matcher.should_evaluate(path) {
            return Decision::Bypass;
        }

        match self.evaluate(path, cookies).await {
            Ok(decision) => decision,
            Err(err) => {
                tracing::warn!(path = %path, error = %err, kind = err.kind(), "authorization failed closed");
                Decision::redirect(LOGIN_PATH, RedirectReason::CollaboratorFailure)
            }
        }
    }

    async fn evaluate(&self, path: &str, cookies: &CookieBag) -> AppResult<Decision> {
        let Some(principal) = self.resolve_principal(cookies).await? else {
            return Ok(Decision::redirect(LOGIN_PATH, RedirectReason::Unauthenticated));
        };

        match self.policy.evaluate(principal.role, path) {
            Access::Allowed => {
                let credentials = ForwardedCredentials::for_session(&principal.session)?;
                tracing::debug!(path = %path, role = %principal.role, "access granted");
                Ok(Decision::Forward(Box::new(Forward {
                    principal,
                    credentials,
                })))
            }
            Access::Denied { .. } if principal.role == RoleKey::Onboarding => {
                tracing::debug!(path = %path, "profile has no role yet");
                Ok(Decision::redirect(ONBOARDING_PATH, RedirectReason::NeedsOnboarding))
            }
            Access::Denied { home } => {
                tracing::debug!(path = %path, role = %principal.role, home = %home, "access denied");
                Ok(Decision::redirect(home, RedirectReason::Denied))
            }
        }
    }

    /// Live session for the cookies, if any. Expired sessions count as none.
    pub async fn resolve_session(&self, cookies: &CookieBag) -> AppResult<Option<Session>> {
        let session = self.bounded("identity provider", self.identity.get_session(cookies)).await?;
        Ok(session.filter(|session| !session.is_expired_at(utc_now())))
    }

    pub async fn resolve_principal(&self, cookies: &CookieBag) -> AppResult<Option<Principal>> {
        let Some(session) = self.resolve_session(cookies).await? else {
            return Ok(None);
        };

        let profile = self
            .bounded("profile store", self.profiles.get_profile_by_email(&session.email))
            .await?;

        Ok(Some(Principal::new(session, profile)))
    }

    async fn bounded<T>(&self, what: &str, call: impl Future<Output = AppResult<T>>) -> AppResult<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| AppError::timeout(what))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    #[test]
    fn credentials_carry_bearer_and_are_sensitive() {
        let session = Session::new("ada@example.com", "abc.def", Utc::now() + ChronoDuration::hours(1));
        let credentials = ForwardedCredentials::for_session(&session).unwrap();
        let value = credentials.authorization().unwrap();
        assert_eq!(value, "Bearer abc.def");
        assert!(value.is_sensitive());
    }

    #[test]
    fn applying_credentials_twice_keeps_one_header() {
        let session = Session::new("ada@example.com", "abc", Utc::now());
        let credentials = ForwardedCredentials::for_session(&session).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer stale"));

        credentials.apply(&mut headers);
        credentials.apply(&mut headers);

        assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let session = Session::new("ada@example.com", "abc\ndef", Utc::now());
        assert!(ForwardedCredentials::for_session(&session).is_err());
    }
}
