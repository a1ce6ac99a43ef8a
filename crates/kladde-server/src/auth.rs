use anyhow::Result;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

use kladde_db::{StoreError, UserStore};

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email and wrong password collapse into this one variant
    /// so a caller cannot probe which emails are registered.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("password hash error: {0}")]
    Hash(String),
}

/// Hash a password using argon2id
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Verify an email/password pair against the user store and return the
/// matching user id.
pub async fn authenticate(
    users: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<i64, AuthError> {
    let user = match users.get_by_email(email).await {
        Ok(user) => user,
        Err(StoreError::NoRecord) => return Err(AuthError::InvalidCredentials),
        Err(err) => return Err(AuthError::Store(err)),
    };

    let ok = verify_password(password, &user.password_hash)
        .map_err(|e| AuthError::Hash(e.to_string()))?;
    if ok {
        Ok(user.user_id)
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

/// Generate a CSRF double-submit token: 32 random bytes, hex-encoded.
pub fn generate_csrf_token() -> String {
    use argon2::password_hash::rand_core::RngCore;
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kladde_db::MemoryUserStore;

    #[test]
    fn test_password_hash_and_verify_correct() {
        let password = "my-secure-password";
        let hash = hash_password(password).unwrap();
        assert!(verify_password(password, &hash).unwrap());
    }

    #[test]
    fn test_password_verify_wrong() {
        let hash = hash_password("correct-password").unwrap();
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_password_different_salts() {
        let password = "same-password";
        let hash1 = hash_password(password).unwrap();
        let hash2 = hash_password(password).unwrap();
        assert_ne!(hash1, hash2);
        // Both still verify
        assert!(verify_password(password, &hash1).unwrap());
        assert!(verify_password(password, &hash2).unwrap());
    }

    #[test]
    fn test_hash_is_not_plaintext() {
        let hash = hash_password("pa$$word").unwrap();
        assert!(!hash.contains("pa$$word"));
        assert!(hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_authenticate_correct_credentials() {
        let store = MemoryUserStore::new();
        let hash = hash_password("pa$$word").unwrap();
        store.insert("Alice", "alice@example.com", &hash).await.unwrap();

        let user_id = authenticate(&store, "alice@example.com", "pa$$word")
            .await
            .unwrap();
        assert_eq!(user_id, 1);
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password() {
        let store = MemoryUserStore::new();
        let hash = hash_password("pa$$word").unwrap();
        store.insert("Alice", "alice@example.com", &hash).await.unwrap();

        let err = authenticate(&store, "alice@example.com", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_authenticate_unknown_email_is_same_error() {
        // Unknown email must be indistinguishable from a wrong password.
        let store = MemoryUserStore::new();
        let err = authenticate(&store, "nobody@example.com", "pa$$word")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn test_csrf_token_format() {
        let token = generate_csrf_token();
        assert_eq!(token.len(), 64, "32 bytes hex-encoded");
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_csrf_token_uniqueness() {
        assert_ne!(generate_csrf_token(), generate_csrf_token());
    }
}
