//! PostgreSQL user store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::access::RoleSet;
use crate::postgres::PostgresPool;

use super::model::{NewUser, Principal, User};
use super::store::{PrincipalLookup, StoreError, UserStore};

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id          UUID PRIMARY KEY,
    email       TEXT NOT NULL UNIQUE,
    full_name   TEXT NOT NULL,
    password    TEXT NOT NULL,
    is_active   BOOLEAN NOT NULL DEFAULT TRUE,
    roles       TEXT[] NOT NULL DEFAULT ARRAY['user'],
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    full_name: String,
    password: String,
    is_active: bool,
    roles: Vec<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            password_hash: row.password,
            is_active: row.is_active,
            roles: row.roles.into_iter().collect::<RoleSet>(),
            created_at: row.created_at,
        }
    }
}

pub struct PostgresUserStore {
    pool: PostgresPool,
}

impl PostgresUserStore {
    pub fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }

    /// Create the users table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_USERS_TABLE)
            .execute(self.pool.pool())
            .await?;
        tracing::info!("Users table ready");
        Ok(())
    }
}

#[async_trait]
impl PrincipalLookup for PostgresUserStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Principal>, StoreError> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, full_name, password, is_active, roles, created_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(row.map(|r| User::from(r).principal()))
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let user = user.into_user();

        sqlx::query(
            "INSERT INTO users (id, email, full_name, password, is_active, roles, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.roles.to_strings())
        .bind(user.created_at)
        .execute(self.pool.pool())
        .await
        .map_err(StoreError::from_write)?;

        tracing::debug!(user_id = %user.id, "User created in PostgreSQL store");
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, full_name, password, is_active, roles, created_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(row.map(User::from))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool.pool())
            .await?;

        u64::try_from(count).map_err(|_| StoreError::InvalidRecord(format!("negative count {count}")))
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
