use thiserror::Error;

/// Domain-level store failures.
///
/// Lookups that match zero rows become `NoRecord` and an insert that
/// trips the unique-email constraint becomes `DuplicateEmail`; anything
/// else the backend reports passes through unchanged for the caller to
/// treat as a server failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no matching record found")]
    NoRecord,

    #[error("duplicate email")]
    DuplicateEmail,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// SQLSTATE for unique-constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Named constraint on `"user".email`, declared in the migrations.
const USER_EMAIL_CONSTRAINT: &str = "user_uc_email";

/// Translates a unique-violation on the user email constraint into
/// `DuplicateEmail`; everything else stays a backend error.
pub(crate) fn translate_insert_user_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
            && db_err.constraint() == Some(USER_EMAIL_CONSTRAINT)
        {
            return StoreError::DuplicateEmail;
        }
    }
    StoreError::Database(err)
}
