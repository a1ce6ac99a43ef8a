//! In-memory store implementations with the same observable semantics
//! as the PostgreSQL ones (expiry filtering, id assignment, duplicate
//! email detection). They back the server integration tests so the
//! request pipeline can be exercised without a live database.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Mutex;

use crate::error::StoreError;
use crate::repos::snippet::{Snippet, SnippetStore, LATEST_LIMIT};
use crate::repos::user::{User, UserStore};

#[derive(Default)]
pub struct MemorySnippetStore {
    rows: Mutex<Vec<Snippet>>,
}

impl MemorySnippetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnippetStore for MemorySnippetStore {
    async fn insert(
        &self,
        title: &str,
        content: &str,
        expires_days: i32,
    ) -> Result<i64, StoreError> {
        let mut rows = self.rows.lock().expect("snippet store mutex poisoned");
        let snippet_id = rows.iter().map(|s| s.snippet_id).max().unwrap_or(0) + 1;
        let now = Utc::now();
        rows.push(Snippet {
            snippet_id,
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
            expires_at: now + Duration::days(i64::from(expires_days)),
        });
        Ok(snippet_id)
    }

    async fn get(&self, snippet_id: i64) -> Result<Snippet, StoreError> {
        let rows = self.rows.lock().expect("snippet store mutex poisoned");
        let now = Utc::now();
        rows.iter()
            .find(|s| s.snippet_id == snippet_id && s.expires_at > now)
            .cloned()
            .ok_or(StoreError::NoRecord)
    }

    async fn latest(&self) -> Result<Vec<Snippet>, StoreError> {
        let rows = self.rows.lock().expect("snippet store mutex poisoned");
        let now = Utc::now();
        let mut live: Vec<Snippet> = rows.iter().filter(|s| s.expires_at > now).cloned().collect();
        live.sort_by(|a, b| b.snippet_id.cmp(&a.snippet_id));
        live.truncate(LATEST_LIMIT as usize);
        Ok(live)
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().expect("user store mutex poisoned");
        if rows.iter().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user_id = rows.iter().map(|u| u.user_id).max().unwrap_or(0) + 1;
        rows.push(User {
            user_id,
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        let rows = self.rows.lock().expect("user store mutex poisoned");
        rows.iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NoRecord)
    }

    async fn exists(&self, user_id: i64) -> Result<bool, StoreError> {
        let rows = self.rows.lock().expect("user store mutex poisoned");
        Ok(rows.iter().any(|u| u.user_id == user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = MemorySnippetStore::new();
        let first = store.insert("One", "a", 7).await.unwrap();
        let second = store.insert("Two", "b", 7).await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[tokio::test]
    async fn test_get_missing_is_no_record() {
        let store = MemorySnippetStore::new();
        assert!(matches!(store.get(99).await, Err(StoreError::NoRecord)));
    }

    #[tokio::test]
    async fn test_get_expired_is_no_record() {
        let store = MemorySnippetStore::new();
        let id = store.insert("Old", "gone", -1).await.unwrap();
        assert!(matches!(store.get(id).await, Err(StoreError::NoRecord)));
    }

    #[tokio::test]
    async fn test_latest_orders_by_id_descending() {
        let store = MemorySnippetStore::new();
        for i in 0..3 {
            store.insert(&format!("Snippet {i}"), "body", 7).await.unwrap();
        }
        let ids: Vec<i64> = store
            .latest()
            .await
            .unwrap()
            .iter()
            .map(|s| s.snippet_id)
            .collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_latest_caps_at_limit_and_skips_expired() {
        let store = MemorySnippetStore::new();
        store.insert("Expired", "body", -1).await.unwrap();
        for i in 0..12 {
            store.insert(&format!("Snippet {i}"), "body", 7).await.unwrap();
        }
        let latest = store.latest().await.unwrap();
        assert_eq!(latest.len(), LATEST_LIMIT as usize);
        assert!(latest.iter().all(|s| s.title != "Expired"));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryUserStore::new();
        store.insert("Alice", "alice@example.com", "hash1").await.unwrap();
        let err = store
            .insert("Other Alice", "alice@example.com", "hash2")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));

        // the failed insert must not have created a row
        let user = store.get_by_email("alice@example.com").await.unwrap();
        assert_eq!(user.name, "Alice");
        assert_eq!(user.password_hash, "hash1");
    }

    #[tokio::test]
    async fn test_get_by_email_missing_is_no_record() {
        let store = MemoryUserStore::new();
        assert!(matches!(
            store.get_by_email("nobody@example.com").await,
            Err(StoreError::NoRecord)
        ));
    }

    #[tokio::test]
    async fn test_exists() {
        let store = MemoryUserStore::new();
        store.insert("Alice", "alice@example.com", "hash").await.unwrap();
        assert!(store.exists(1).await.unwrap());
        assert!(!store.exists(2).await.unwrap());
    }
}
