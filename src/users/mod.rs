//! User directory.
//!
//! - `model`: principal and stored user types
//! - `store`: lookup and persistence traits
//! - `memory`: DashMap-backed store
//! - `postgres`: sqlx-backed store

mod memory;
mod model;
mod postgres;
mod store;

use std::sync::Arc;

pub use memory::MemoryUserStore;
pub use model::{NewUser, Principal, User};
pub use postgres::PostgresUserStore;
pub use store::{PrincipalLookup, StoreError, UserStore};

use crate::config::DatabaseConfig;
use crate::postgres::{PostgresPool, PostgresPoolError};

/// Both views of one user store: accounts use `users`, the session
/// registry and authentication use `principals`.
#[derive(Clone)]
pub struct UserDirectory {
    pub users: Arc<dyn UserStore>,
    pub principals: Arc<dyn PrincipalLookup>,
}

impl UserDirectory {
    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(MemoryUserStore::new()))
    }

    pub fn from_memory(store: Arc<MemoryUserStore>) -> Self {
        Self {
            users: store.clone(),
            principals: store,
        }
    }

    pub fn from_postgres(store: Arc<PostgresUserStore>) -> Self {
        Self {
            users: store.clone(),
            principals: store,
        }
    }
}

/// Build the user directory from configuration.
///
/// Without a database URL the in-memory store is used.
pub async fn create_user_directory(
    config: &DatabaseConfig,
) -> Result<(UserDirectory, Option<PostgresPool>), PostgresPoolError> {
    let Some(url) = config.url.as_deref() else {
        tracing::info!(backend = "memory", "User directory initialized");
        return Ok((UserDirectory::in_memory(), None));
    };

    let pool = PostgresPool::new(url, config).await?;
    let store = Arc::new(PostgresUserStore::new(pool.clone()));
    store
        .ensure_schema()
        .await
        .map_err(|e| PostgresPoolError::ConnectionUnavailable(e.to_string()))?;

    tracing::info!(
        backend = "postgres",
        url = %pool.database_url_masked(),
        "User directory initialized"
    );

    Ok((UserDirectory::from_postgres(store), Some(pool)))
}
