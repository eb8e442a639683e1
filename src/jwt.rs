use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::errors::AppError;

/// HS256 codec for the identity provider's session tokens.
#[derive(Debug, Clone)]
pub struct SessionTokenConfig {
    pub secret: Arc<Vec<u8>>,
    pub exp_hours: i64,
}

impl SessionTokenConfig {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            exp_hours: 1,
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let secret = std::env::var("SESSION_JWT_SECRET")
            .map_err(|_| AppError::configuration("SESSION_JWT_SECRET not set"))?;
        let exp_hours = std::env::var("SESSION_EXP_HOURS")
            .map(|val| val.parse::<i64>())
            .unwrap_or(Ok(1))
            .map_err(|_| AppError::configuration("SESSION_EXP_HOURS must be a valid integer"))?;

        Ok(Self {
            secret: Arc::new(secret.into_bytes()),
            exp_hours,
        })
    }

    pub fn with_exp_hours(mut self, exp_hours: i64) -> Self {
        self.exp_hours = exp_hours;
        self
    }

    pub fn encode(&self, email: &str) -> Result<String, AppError> {
        let now = Utc::now();
        self.encode_with_expiry(email, now + Duration::hours(self.exp_hours))
    }

    pub fn encode_with_expiry(&self, email: &str, expires_at: DateTime<Utc>) -> Result<String, AppError> {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: email.to_string(),
            exp: expires_at.timestamp(),
            iat: Utc::now().timestamp(),
        };

        jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
            .map_err(|err| AppError::token(err.to_string()))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        // Provider tokens carry an `aud` the gateway does not pin.
        validation.validate_aud = false;

        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|err| AppError::token(err.to_string()))
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}
