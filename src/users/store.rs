use async_trait::async_trait;
use thiserror::Error;

use super::model::{NewUser, Principal, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

impl StoreError {
    /// Classify a failed write: unique violations become [`StoreError::Duplicate`]
    /// carrying the database detail.
    pub fn from_write(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return StoreError::Duplicate(db_err.message().to_string());
            }
        }
        StoreError::Database(e)
    }
}

/// Resolves principals by identifier.
///
/// This is the only view of persistence the session registry and the
/// authentication middleware depend on.
#[async_trait]
pub trait PrincipalLookup: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Principal>, StoreError>;
}

/// Account persistence used by registration and login.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with [`StoreError::Duplicate`] when the
    /// email is already taken.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// Look up a user by (lower-cased) email, including the password hash.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Number of stored users
    async fn count(&self) -> Result<u64, StoreError>;

    /// Backend name for health reporting
    fn backend_name(&self) -> &'static str;
}
