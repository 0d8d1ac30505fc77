use async_trait::async_trait;
use uuid::Uuid;

use crate::users::StoreError;

use super::model::Product;

/// A resolved window into the catalog listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
        }
    }
}

/// Product persistence.
///
/// Titles and slugs are unique; writes that would break that fail with
/// [`StoreError::Duplicate`].
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert(&self, product: Product) -> Result<Product, StoreError>;

    /// Products ordered by creation time.
    async fn list(&self, page: Page) -> Result<Vec<Product>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError>;

    /// Match a title case-insensitively or a slug exactly (after lower-casing
    /// `term`).
    async fn find_by_title_or_slug(&self, term: &str) -> Result<Option<Product>, StoreError>;

    /// Replace a stored product, images included. `Ok(None)` when it does
    /// not exist.
    async fn update(&self, product: Product) -> Result<Option<Product>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    fn backend_name(&self) -> &'static str;
}
