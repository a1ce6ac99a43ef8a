use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::StoreError;

/// `latest` never returns more than this many rows.
pub const LATEST_LIMIT: i64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Snippet {
    pub snippet_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Snippet persistence. A snippet is visible only until its expiry;
/// expired rows are filtered by every read, never deleted.
#[async_trait]
pub trait SnippetStore: Send + Sync {
    /// Inserts a snippet expiring `expires_days` from now and returns
    /// the store-assigned id.
    async fn insert(
        &self,
        title: &str,
        content: &str,
        expires_days: i32,
    ) -> Result<i64, StoreError>;

    /// Fetches one non-expired snippet, `NoRecord` if absent or expired.
    async fn get(&self, snippet_id: i64) -> Result<Snippet, StoreError>;

    /// The newest non-expired snippets, id-descending, at most
    /// [`LATEST_LIMIT`].
    async fn latest(&self) -> Result<Vec<Snippet>, StoreError>;
}

#[derive(Clone)]
pub struct PgSnippetStore {
    pool: PgPool,
}

impl PgSnippetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnippetStore for PgSnippetStore {
    async fn insert(
        &self,
        title: &str,
        content: &str,
        expires_days: i32,
    ) -> Result<i64, StoreError> {
        let (snippet_id,): (i64,) = sqlx::query_as(
            "INSERT INTO snippet (title, content, expires_at) \
             VALUES ($1, $2, now() + make_interval(days => $3)) \
             RETURNING snippet_id",
        )
        .bind(title)
        .bind(content)
        .bind(expires_days)
        .fetch_one(&self.pool)
        .await?;
        Ok(snippet_id)
    }

    async fn get(&self, snippet_id: i64) -> Result<Snippet, StoreError> {
        sqlx::query_as::<_, Snippet>(
            "SELECT snippet_id, title, content, created_at, expires_at \
             FROM snippet WHERE expires_at > now() AND snippet_id = $1",
        )
        .bind(snippet_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NoRecord)
    }

    async fn latest(&self) -> Result<Vec<Snippet>, StoreError> {
        let snippets = sqlx::query_as::<_, Snippet>(
            "SELECT snippet_id, title, content, created_at, expires_at \
             FROM snippet WHERE expires_at > now() \
             ORDER BY snippet_id DESC LIMIT $1",
        )
        .bind(LATEST_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(snippets)
    }
}
