//! Session resolution against the external identity provider.
//!
//! The gateway never issues or refreshes sessions. It only asks the provider
//! whether the cookies on a request belong to a live session.

mod local;
mod remote;

pub use local::JwtIdentityProvider;
pub use remote::RemoteIdentityProvider;

use std::fmt;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};

use crate::errors::AppResult;
use crate::models::Session;

/// Identity provider collaborator.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when the cookies carry no session; `Err` when the provider
    /// could not answer. Callers treat both as unauthenticated.
    async fn get_session(&self, cookies: &CookieBag) -> AppResult<Option<Session>>;
}

/// Cookies from the incoming request, passed to the provider untouched.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CookieBag {
    pairs: Vec<(String, String)>,
}

impl CookieBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let pairs = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|cookie| {
                let (name, value) = cookie.trim().split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some((name.to_string(), value.trim().trim_matches('"').to_string()))
            })
            .collect();

        Self { pairs }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((name.into(), value.into()));
        self
    }

    /// First cookie with the given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

// Cookie values are credentials; only names are printed.
impl fmt::Debug for CookieBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.pairs.iter().map(|(name, _)| name))
            .finish()
    }
}
