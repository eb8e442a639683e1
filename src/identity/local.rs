use async_trait::async_trait;

use super::{CookieBag, IdentityProvider};
use crate::errors::{AppError, AppResult};
use crate::jwt::SessionTokenConfig;
use crate::models::Session;
use crate::utils::timestamp_to_utc;

/// Validates the provider's session JWT locally with its shared secret.
#[derive(Debug, Clone)]
pub struct JwtIdentityProvider {
    cookie_name: String,
    codec: SessionTokenConfig,
}

impl JwtIdentityProvider {
    pub fn new(cookie_name: impl Into<String>, codec: SessionTokenConfig) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            codec,
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn get_session(&self, cookies: &CookieBag) -> AppResult<Option<Session>> {
        let Some(token) = cookies.get(&self.cookie_name).filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        let claims = self.codec.decode(token)?;
        if claims.email.is_empty() {
            return Err(AppError::token("session token has no email claim"));
        }

        let expires_at = timestamp_to_utc(claims.exp)
            .ok_or_else(|| AppError::token("session token has an invalid exp claim"))?;

        Ok(Some(Session::new(claims.email, token, expires_at)))
    }
}
