use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::RoleKey;

/// Application-level user record joined with its role.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    /// Raw role name as stored; `None` until onboarding assigns one.
    pub role: Option<String>,
    pub verified: bool,
}

impl Profile {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            full_name: None,
            phone: None,
            role: None,
            verified: true,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_verified(mut self, verified: bool) -> Self {
        self.verified = verified;
        self
    }

    /// The role used for policy evaluation. Blank role names count as no role.
    pub fn effective_role(&self) -> RoleKey {
        let role = match self.role.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => RoleKey::normalize(name),
            _ => return RoleKey::Onboarding,
        };

        if !self.verified && role.requires_verification() {
            RoleKey::NotVerified
        } else {
            role
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbProfile {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub verified: bool,
    pub role_name: Option<String>,
}

impl TryFrom<DbProfile> for Profile {
    type Error = AppError;

    fn try_from(value: DbProfile) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id)
            .map_err(|err| AppError::internal(format!("invalid profile id {}: {err}", value.id)))?;

        Ok(Profile {
            id,
            email: value.email,
            full_name: value.full_name,
            phone: value.phone,
            role: value.role_name,
            verified: value.verified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_role_means_onboarding() {
        assert_eq!(Profile::new("a@example.com").effective_role(), RoleKey::Onboarding);
        assert_eq!(
            Profile::new("a@example.com").with_role("  ").effective_role(),
            RoleKey::Onboarding
        );
    }

    #[test]
    fn unverified_professionals_are_held_back() {
        let realtor = Profile::new("r@example.com").with_role("Realtor").with_verified(false);
        assert_eq!(realtor.effective_role(), RoleKey::NotVerified);

        let immigrant = Profile::new("i@example.com").with_role("Immigrant").with_verified(false);
        assert_eq!(immigrant.effective_role(), RoleKey::Immigrant);
    }

    #[test]
    fn db_row_with_bad_id_is_rejected() {
        let row = DbProfile {
            id: "not-a-uuid".into(),
            email: "a@example.com".into(),
            full_name: None,
            phone: None,
            verified: true,
            role_name: None,
        };
        assert!(Profile::try_from(row).is_err());
    }
}
