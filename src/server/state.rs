use std::sync::Arc;
use std::time::Instant;

use crate::accounts::AccountService;
use crate::auth::{JwtService, PasswordHasher};
use crate::config::Settings;
use crate::files::ImageStorage;
use crate::postgres::PostgresPool;
use crate::products::{MemoryProductStore, ProductService, ProductStore};
use crate::session::SessionRegistry;
use crate::users::UserDirectory;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub jwt: Arc<JwtService>,
    pub accounts: AccountService,
    pub directory: UserDirectory,
    pub products: ProductService,
    pub images: Arc<ImageStorage>,
    pub sessions: Arc<SessionRegistry>,
    pub postgres_pool: Option<PostgresPool>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        settings: Settings,
        directory: UserDirectory,
        postgres_pool: Option<PostgresPool>,
    ) -> Self {
        let jwt = Arc::new(JwtService::new(&settings.jwt));
        let hasher = PasswordHasher::new(settings.auth.bcrypt_cost);
        let accounts = AccountService::new(directory.users.clone(), hasher, jwt.clone());
        let sessions = Arc::new(SessionRegistry::new(directory.principals.clone()));
        let products = ProductService::new(Arc::new(MemoryProductStore::new()));
        let images = Arc::new(ImageStorage::new(&settings.files));

        Self {
            settings: Arc::new(settings),
            jwt,
            accounts,
            directory,
            products,
            images,
            sessions,
            postgres_pool,
            start_time: Instant::now(),
        }
    }

    /// Replace the catalog store, e.g. with the database-backed one.
    pub fn with_products(mut self, store: Arc<dyn ProductStore>) -> Self {
        self.products = ProductService::new(store);
        self
    }

    /// In-memory state, as used by tests and local runs without a database.
    pub fn in_memory(settings: Settings) -> Self {
        Self::new(settings, UserDirectory::in_memory(), None)
    }
}
