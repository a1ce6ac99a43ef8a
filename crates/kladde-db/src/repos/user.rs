use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::{translate_insert_user_error, StoreError};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// User persistence. Emails are unique across all users; the store
/// reports a violated insert as `DuplicateEmail`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, name: &str, email: &str, password_hash: &str)
        -> Result<(), StoreError>;

    /// `NoRecord` when no user carries this email.
    async fn get_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Whether a user with this id still exists. Used to re-check
    /// session-referenced ids against the store.
    async fn exists(&self, user_id: i64) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(r#"INSERT INTO "user" (name, email, password_hash) VALUES ($1, $2, $3)"#)
            .bind(name)
            .bind(email)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(translate_insert_user_error)?;
        Ok(())
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"SELECT user_id, name, email, password_hash, created_at FROM "user" WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NoRecord)
    }

    async fn exists(&self, user_id: i64) -> Result<bool, StoreError> {
        let (exists,): (bool,) =
            sqlx::query_as(r#"SELECT EXISTS(SELECT 1 FROM "user" WHERE user_id = $1)"#)
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}
