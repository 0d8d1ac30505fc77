//! In-memory product store.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::users::StoreError;

use super::model::Product;
use super::store::{Page, ProductStore};

pub struct MemoryProductStore {
    products: DashMap<Uuid, Product>,
    /// Held across the uniqueness check and the write
    writes: Mutex<()>,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self {
            products: DashMap::new(),
            writes: Mutex::new(()),
        }
    }

    fn check_unique(&self, product: &Product) -> Result<(), StoreError> {
        for other in self.products.iter() {
            if other.id == product.id {
                continue;
            }
            if other.title == product.title {
                return Err(StoreError::Duplicate(format!(
                    "Key (title)=({}) already exists.",
                    product.title
                )));
            }
            if other.slug == product.slug {
                return Err(StoreError::Duplicate(format!(
                    "Key (slug)=({}) already exists.",
                    product.slug
                )));
            }
        }
        Ok(())
    }
}

impl Default for MemoryProductStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn insert(&self, product: Product) -> Result<Product, StoreError> {
        let _guard = self.writes.lock();
        self.check_unique(&product)?;
        self.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn list(&self, page: Page) -> Result<Vec<Product>, StoreError> {
        let mut products: Vec<Product> = self.products.iter().map(|p| p.clone()).collect();
        products.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(products
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.products.get(&id).map(|p| p.clone()))
    }

    async fn find_by_title_or_slug(&self, term: &str) -> Result<Option<Product>, StoreError> {
        let title = term.to_uppercase();
        let slug = term.to_lowercase();

        Ok(self
            .products
            .iter()
            .find(|p| p.title.to_uppercase() == title || p.slug == slug)
            .map(|p| p.clone()))
    }

    async fn update(&self, product: Product) -> Result<Option<Product>, StoreError> {
        let _guard = self.writes.lock();
        if !self.products.contains_key(&product.id) {
            return Ok(None);
        }
        self.check_unique(&product)?;
        self.products.insert(product.id, product.clone());
        Ok(Some(product))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let _guard = self.writes.lock();
        Ok(self.products.remove(&id).is_some())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::products::slugify;
    use chrono::{Duration, Utc};

    fn product(title: &str, minutes_ago: i64) -> Product {
        Product {
            id: Uuid::new_v4(),
            title: title.to_string(),
            price: 10.0,
            description: None,
            slug: slugify(title),
            stock: 1,
            sizes: vec!["M".to_string()],
            gender: "unisex".to_string(),
            tags: vec![],
            images: vec![],
            user_id: Uuid::new_v4(),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryProductStore::new();
        let tee = store.insert(product("Cyber Tee", 0)).await.unwrap();

        assert_eq!(store.find_by_id(tee.id).await.unwrap(), Some(tee.clone()));
        assert_eq!(
            store.find_by_title_or_slug("CYBER TEE").await.unwrap(),
            Some(tee.clone())
        );
        assert_eq!(
            store.find_by_title_or_slug("Cyber-Tee").await.unwrap(),
            Some(tee)
        );
        assert!(store.find_by_title_or_slug("hoodie").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_title_and_slug_rejected() {
        let store = MemoryProductStore::new();
        store.insert(product("Cyber Tee", 0)).await.unwrap();

        let err = store.insert(product("Cyber Tee", 0)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        let mut same_slug = product("Other Tee", 0);
        same_slug.slug = "cyber-tee".to_string();
        let err = store.insert(same_slug).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_list_is_ordered_and_paged() {
        let store = MemoryProductStore::new();
        for (title, age) in [("Third", 1), ("First", 3), ("Second", 2)] {
            store.insert(product(title, age)).await.unwrap();
        }

        let titles = |items: Vec<Product>| items.into_iter().map(|p| p.title).collect::<Vec<_>>();

        let all = store.list(Page::default()).await.unwrap();
        assert_eq!(titles(all), vec!["First", "Second", "Third"]);

        let window = store.list(Page { limit: 1, offset: 1 }).await.unwrap();
        assert_eq!(titles(window), vec!["Second"]);

        let past_end = store.list(Page { limit: 5, offset: 10 }).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = MemoryProductStore::new();
        let mut tee = store.insert(product("Cyber Tee", 0)).await.unwrap();
        let other = store.insert(product("Hoodie", 0)).await.unwrap();

        tee.price = 25.0;
        let updated = store.update(tee.clone()).await.unwrap().unwrap();
        assert_eq!(updated.price, 25.0);

        // renaming onto another product's title fails and changes nothing
        let mut clash = tee.clone();
        clash.title = other.title.clone();
        assert!(store.update(clash).await.is_err());
        assert_eq!(store.find_by_id(tee.id).await.unwrap().unwrap().title, "Cyber Tee");

        assert!(store.delete(tee.id).await.unwrap());
        assert!(!store.delete(tee.id).await.unwrap());
        assert!(store.update(tee).await.unwrap().is_none());
    }
}
