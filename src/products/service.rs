use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;
use crate::metrics::CatalogMetrics;
use crate::users::{Principal, StoreError};

use super::dto::{CreateProductRequest, UpdateProductRequest};
use super::model::{slugify, Product, GENDERS};
use super::store::{Page, ProductStore};

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Product #{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Duplicate(String),

    #[error(transparent)]
    Store(StoreError),

    /// The acting principal id is not a user id this catalog can store.
    #[error("Invalid product owner: {0}")]
    InvalidOwner(String),
}

impl From<StoreError> for ProductError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(detail) => ProductError::Duplicate(detail),
            other => ProductError::Store(other),
        }
    }
}

impl From<ProductError> for AppError {
    fn from(e: ProductError) -> Self {
        match e {
            ProductError::Validation(_) => AppError::Validation(e.to_string()),
            ProductError::NotFound(_) => AppError::NotFound(e.to_string()),
            ProductError::Duplicate(detail) => AppError::Conflict(detail),
            ProductError::Store(e) => e.into(),
            ProductError::InvalidOwner(_) => AppError::Internal(e.to_string()),
        }
    }
}

/// Catalog reads and admin writes.
#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn ProductStore>,
}

impl ProductService {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    #[tracing::instrument(name = "products.create", skip_all)]
    pub async fn create(
        &self,
        request: CreateProductRequest,
        actor: &Principal,
    ) -> Result<Product, ProductError> {
        let result = self.try_create(request, actor).await;
        CatalogMetrics::record_product_write("create", result.is_ok());
        result
    }

    async fn try_create(
        &self,
        request: CreateProductRequest,
        actor: &Principal,
    ) -> Result<Product, ProductError> {
        let user_id = owner_id(actor)?;
        let slug = match request.slug.as_deref() {
            Some(slug) => slugify(slug),
            None => slugify(&request.title),
        };

        let product = Product {
            id: Uuid::new_v4(),
            title: request.title.trim().to_string(),
            price: request.price,
            description: request.description,
            slug,
            stock: request.stock,
            sizes: request.sizes,
            gender: request.gender,
            tags: request.tags,
            images: request.images,
            user_id,
            created_at: Utc::now(),
        };
        validate(&product)?;

        let product = self.store.insert(product).await?;
        tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
        Ok(product)
    }

    pub async fn list(&self, page: Page) -> Result<Vec<Product>, ProductError> {
        Ok(self.store.list(page).await?)
    }

    /// Look a product up by id when `term` is a UUID, otherwise by title or slug.
    pub async fn find(&self, term: &str) -> Result<Product, ProductError> {
        let found = match Uuid::parse_str(term) {
            Ok(id) => self.store.find_by_id(id).await?,
            Err(_) => self.store.find_by_title_or_slug(term).await?,
        };

        found.ok_or_else(|| ProductError::NotFound(term.to_string()))
    }

    #[tracing::instrument(name = "products.update", skip_all, fields(product_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateProductRequest,
        actor: &Principal,
    ) -> Result<Product, ProductError> {
        let result = self.try_update(id, request, actor).await;
        CatalogMetrics::record_product_write("update", result.is_ok());
        result
    }

    async fn try_update(
        &self,
        id: Uuid,
        request: UpdateProductRequest,
        actor: &Principal,
    ) -> Result<Product, ProductError> {
        let user_id = owner_id(actor)?;
        let mut product = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ProductError::NotFound(id.to_string()))?;

        if let Some(title) = request.title {
            product.title = title.trim().to_string();
        }
        if let Some(price) = request.price {
            product.price = price;
        }
        if let Some(description) = request.description {
            product.description = Some(description);
        }
        // A title change alone keeps the existing slug
        if let Some(slug) = request.slug {
            product.slug = slugify(&slug);
        }
        if let Some(stock) = request.stock {
            product.stock = stock;
        }
        if let Some(sizes) = request.sizes {
            product.sizes = sizes;
        }
        if let Some(gender) = request.gender {
            product.gender = gender;
        }
        if let Some(tags) = request.tags {
            product.tags = tags;
        }
        if let Some(images) = request.images {
            product.images = images;
        }
        product.user_id = user_id;
        validate(&product)?;

        let product = self
            .store
            .update(product)
            .await?
            .ok_or_else(|| ProductError::NotFound(id.to_string()))?;
        tracing::info!(product_id = %product.id, "Product updated");
        Ok(product)
    }

    #[tracing::instrument(name = "products.delete", skip_all, fields(product_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ProductError> {
        let result = match self.store.delete(id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ProductError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        };
        CatalogMetrics::record_product_write("delete", result.is_ok());

        if result.is_ok() {
            tracing::info!("Product deleted");
        }
        result
    }
}

fn owner_id(actor: &Principal) -> Result<Uuid, ProductError> {
    Uuid::parse_str(&actor.id).map_err(|_| ProductError::InvalidOwner(actor.id.clone()))
}

fn validate(product: &Product) -> Result<(), ProductError> {
    let mut errors = Vec::new();

    if product.title.is_empty() {
        errors.push("title must not be empty".to_string());
    }
    if product.slug.is_empty() {
        errors.push("slug must not be empty".to_string());
    }
    if !product.price.is_finite() || product.price < 0.0 {
        errors.push("price must be a positive number".to_string());
    }
    if product.stock < 0 {
        errors.push("stock must be a positive number".to_string());
    }
    if product.sizes.iter().any(|s| s.trim().is_empty()) {
        errors.push("sizes must not contain empty entries".to_string());
    }
    if !GENDERS.contains(&product.gender.as_str()) {
        errors.push(format!("gender must be one of: {}", GENDERS.join(", ")));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ProductError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::products::MemoryProductStore;

    fn service() -> ProductService {
        ProductService::new(Arc::new(MemoryProductStore::new()))
    }

    fn admin() -> Principal {
        Principal {
            id: Uuid::new_v4().to_string(),
            email: "admin@shop.test".to_string(),
            full_name: "Ada Admin".to_string(),
            roles: ["admin"].into_iter().collect(),
            is_active: true,
        }
    }

    fn tee() -> CreateProductRequest {
        CreateProductRequest {
            title: "Men's Cyber Tee".to_string(),
            price: 35.0,
            description: None,
            slug: None,
            stock: 5,
            sizes: vec!["S".to_string(), "M".to_string()],
            gender: "men".to_string(),
            tags: vec!["shirt".to_string()],
            images: vec!["tee-1.jpg".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_derives_slug_and_owner() {
        let service = service();
        let actor = admin();

        let product = service.create(tee(), &actor).await.unwrap();
        assert_eq!(product.slug, "mens-cyber-tee");
        assert_eq!(product.user_id.to_string(), actor.id);
        assert_eq!(product.images, vec!["tee-1.jpg"]);
    }

    #[tokio::test]
    async fn test_create_normalises_given_slug() {
        let service = service();
        let mut request = tee();
        request.slug = Some("Cyber Tee Limited".to_string());

        let product = service.create(request, &admin()).await.unwrap();
        assert_eq!(product.slug, "cyber-tee-limited");
    }

    #[tokio::test]
    async fn test_create_validation() {
        let service = service();
        let mut request = tee();
        request.title = "  ".to_string();
        request.price = -1.0;
        request.gender = "robot".to_string();

        let err = service.create(request, &admin()).await.unwrap_err();
        let ProductError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.starts_with("gender")));
    }

    #[tokio::test]
    async fn test_duplicate_title() {
        let service = service();
        service.create(tee(), &admin()).await.unwrap();

        let err = service.create(tee(), &admin()).await.unwrap_err();
        assert!(matches!(err, ProductError::Duplicate(_)));
        assert_eq!(AppError::from(err).code(), "DUPLICATE");
    }

    #[tokio::test]
    async fn test_find_by_id_title_or_slug() {
        let service = service();
        let product = service.create(tee(), &admin()).await.unwrap();

        for term in [
            product.id.to_string(),
            "men's cyber tee".to_string(),
            "MENS-CYBER-TEE".to_string(),
        ] {
            assert_eq!(service.find(&term).await.unwrap().id, product.id);
        }

        let err = service.find("missing").await.unwrap_err();
        assert_eq!(err.to_string(), "Product #missing not found");
        assert_eq!(AppError::from(err).code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_update_keeps_slug_unless_given() {
        let service = service();
        let product = service.create(tee(), &admin()).await.unwrap();
        let editor = admin();

        let renamed = service
            .update(
                product.id,
                UpdateProductRequest {
                    title: Some("Cyber Tee v2".to_string()),
                    stock: Some(0),
                    ..Default::default()
                },
                &editor,
            )
            .await
            .unwrap();
        assert_eq!(renamed.title, "Cyber Tee v2");
        assert_eq!(renamed.slug, "mens-cyber-tee");
        assert_eq!(renamed.stock, 0);
        assert_eq!(renamed.user_id.to_string(), editor.id);

        let reslugged = service
            .update(
                product.id,
                UpdateProductRequest {
                    slug: Some("Cyber Tee v2".to_string()),
                    ..Default::default()
                },
                &editor,
            )
            .await
            .unwrap();
        assert_eq!(reslugged.slug, "cyber-tee-v2");
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_and_missing() {
        let service = service();
        let product = service.create(tee(), &admin()).await.unwrap();

        let err = service
            .update(
                product.id,
                UpdateProductRequest {
                    stock: Some(-3),
                    ..Default::default()
                },
                &admin(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProductError::Validation(_)));
        assert_eq!(service.find(&product.slug).await.unwrap().stock, 5);

        let err = service
            .update(Uuid::new_v4(), UpdateProductRequest::default(), &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, ProductError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let service = service();
        let product = service.create(tee(), &admin()).await.unwrap();

        service.delete(product.id).await.unwrap();
        assert!(matches!(
            service.delete(product.id).await,
            Err(ProductError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_non_uuid_actor_rejected() {
        let service = service();
        let mut actor = admin();
        actor.id = "not-a-uuid".to_string();

        let err = service.create(tee(), &actor).await.unwrap_err();
        assert!(matches!(err, ProductError::InvalidOwner(_)));
    }
}
