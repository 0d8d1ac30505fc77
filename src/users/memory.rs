//! In-memory user store.
//!
//! Used when no database URL is configured and by tests. Data is lost on
//! restart.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::model::{NewUser, Principal, User};
use super::store::{PrincipalLookup, StoreError, UserStore};

pub struct MemoryUserStore {
    /// user_id -> User
    users: DashMap<Uuid, User>,
    /// email -> user_id
    email_index: DashMap<String, Uuid>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            email_index: DashMap::new(),
        }
    }

    /// Insert a fully formed user record (seeding, tests).
    pub fn insert(&self, user: User) -> Result<(), StoreError> {
        match self.email_index.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(format!(
                "Key (email)=({}) already exists.",
                user.email
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, user);
                Ok(())
            }
        }
    }

    /// Toggle the active flag. Returns false if the user does not exist.
    pub fn set_active(&self, id: Uuid, active: bool) -> bool {
        match self.users.get_mut(&id) {
            Some(mut user) => {
                user.is_active = active;
                true
            }
            None => false,
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PrincipalLookup for MemoryUserStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Principal>, StoreError> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|user| user.principal()))
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let user = user.into_user();
        self.insert(user.clone())?;
        tracing::debug!(user_id = %user.id, "User created in memory store");
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let Some(id) = self.email_index.get(email).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|user| user.clone()))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.users.len() as u64)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser::with_default_roles(email, "Test User", "$2b$04$hash")
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("a@shop.test")).await.unwrap();

        let by_email = store.find_by_email("a@shop.test").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);

        let principal = store.find_by_id(&user.id.to_string()).await.unwrap().unwrap();
        assert_eq!(principal.email, "a@shop.test");
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryUserStore::new();
        store.create(new_user("dup@shop.test")).await.unwrap();

        let err = store.create(new_user("dup@shop.test")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_by_malformed_id() {
        let store = MemoryUserStore::new();
        assert!(store.find_by_id("not-a-uuid").await.unwrap().is_none());
        assert!(store
            .find_by_id(&Uuid::new_v4().to_string())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_set_active() {
        let store = MemoryUserStore::new();
        let user = store.create(new_user("b@shop.test")).await.unwrap();

        assert!(store.set_active(user.id, false));
        let principal = store.find_by_id(&user.id.to_string()).await.unwrap().unwrap();
        assert!(!principal.is_active);

        assert!(!store.set_active(Uuid::new_v4(), false));
    }
}
