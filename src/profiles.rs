use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::errors::AppResult;
use crate::models::profile::DbProfile;
use crate::models::Profile;

/// Application user store, joined with role.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile_by_email(&self, email: &str) -> AppResult<Option<Profile>>;

    /// Cheap liveness probe for the health endpoint.
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SqliteProfileStore {
    pool: SqlitePool,
}

impl SqliteProfileStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn get_profile_by_email(&self, email: &str) -> AppResult<Option<Profile>> {
        let row = sqlx::query_as::<_, DbProfile>(
            "SELECT p.id, p.email, p.full_name, p.phone, p.verified, r.name AS role_name \
             FROM profiles p LEFT JOIN roles r ON r.id = p.role_id \
             WHERE p.email = ? COLLATE NOCASE",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Profile::try_from).transpose()
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
