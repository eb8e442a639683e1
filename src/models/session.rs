use std::fmt;

use chrono::{DateTime, Utc};

/// An authenticated principal for the lifetime of one request.
///
/// Issued by the identity provider; the gateway only reads it.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(email: impl Into<String>, token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            email: email.into(),
            token: token.into(),
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

// The token must never reach logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn debug_output_redacts_token() {
        let session = Session::new("ada@example.com", "secret-token", Utc::now());
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("ada@example.com"));
    }

    #[test]
    fn expiry_is_inclusive() {
        let now = Utc::now();
        let session = Session::new("ada@example.com", "t", now);
        assert!(session.is_expired_at(now));
        assert!(!session.is_expired_at(now - Duration::seconds(1)));
    }
}
