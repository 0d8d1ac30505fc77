//! PostgreSQL product store. Images live in their own table and are
//! replaced wholesale on update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::postgres::PostgresPool;
use crate::users::StoreError;

use super::model::Product;
use super::store::{Page, ProductStore};

const CREATE_PRODUCTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id          UUID PRIMARY KEY,
    title       TEXT NOT NULL UNIQUE,
    price       DOUBLE PRECISION NOT NULL DEFAULT 0,
    description TEXT,
    slug        TEXT NOT NULL UNIQUE,
    stock       INTEGER NOT NULL DEFAULT 0,
    sizes       TEXT[] NOT NULL,
    gender      TEXT NOT NULL,
    tags        TEXT[] NOT NULL DEFAULT '{}',
    user_id     UUID NOT NULL REFERENCES users(id),
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CREATE_PRODUCT_IMAGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS product_images (
    id          BIGSERIAL PRIMARY KEY,
    url         TEXT NOT NULL,
    product_id  UUID NOT NULL REFERENCES products(id) ON DELETE CASCADE
)
"#;

/// Product columns plus the image URLs in insertion order.
const SELECT_PRODUCTS: &str = "\
SELECT p.id, p.title, p.price, p.description, p.slug, p.stock, p.sizes, p.gender, p.tags, \
       p.user_id, p.created_at, \
       COALESCE(ARRAY_AGG(i.url ORDER BY i.id) FILTER (WHERE i.url IS NOT NULL), '{}'::TEXT[]) AS images \
FROM products p \
LEFT JOIN product_images i ON i.product_id = p.id";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    title: String,
    price: f64,
    description: Option<String>,
    slug: String,
    stock: i32,
    sizes: Vec<String>,
    gender: String,
    tags: Vec<String>,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    images: Vec<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            title: row.title,
            price: row.price,
            description: row.description,
            slug: row.slug,
            stock: row.stock,
            sizes: row.sizes,
            gender: row.gender,
            tags: row.tags,
            images: row.images,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

pub struct PostgresProductStore {
    pool: PostgresPool,
}

impl PostgresProductStore {
    pub fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }

    /// Create the product tables if missing. Requires the users table.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_PRODUCTS_TABLE)
            .execute(self.pool.pool())
            .await?;
        sqlx::query(CREATE_PRODUCT_IMAGES_TABLE)
            .execute(self.pool.pool())
            .await?;
        tracing::info!("Product tables ready");
        Ok(())
    }

    async fn insert_images(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        product_id: Uuid,
        images: &[String],
    ) -> Result<(), StoreError> {
        if images.is_empty() {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO product_images (url, product_id) \
             SELECT url, $2 FROM UNNEST($1::TEXT[]) WITH ORDINALITY AS t(url, n) ORDER BY n",
        )
        .bind(images)
        .bind(product_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ProductStore for PostgresProductStore {
    async fn insert(&self, product: Product) -> Result<Product, StoreError> {
        let mut tx = self.pool.pool().begin().await?;

        sqlx::query(
            "INSERT INTO products \
             (id, title, price, description, slug, stock, sizes, gender, tags, user_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(product.id)
        .bind(&product.title)
        .bind(product.price)
        .bind(&product.description)
        .bind(&product.slug)
        .bind(product.stock)
        .bind(&product.sizes)
        .bind(&product.gender)
        .bind(&product.tags)
        .bind(product.user_id)
        .bind(product.created_at)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_write)?;

        Self::insert_images(&mut tx, product.id, &product.images).await?;
        tx.commit().await?;

        tracing::debug!(product_id = %product.id, "Product created in PostgreSQL store");
        Ok(product)
    }

    async fn list(&self, page: Page) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{SELECT_PRODUCTS} GROUP BY p.id ORDER BY p.created_at, p.id LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(self.pool.pool())
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "{SELECT_PRODUCTS} WHERE p.id = $1 GROUP BY p.id"
        ))
        .bind(id)
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(row.map(Product::from))
    }

    async fn find_by_title_or_slug(&self, term: &str) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "{SELECT_PRODUCTS} WHERE UPPER(p.title) = $1 OR p.slug = $2 \
             GROUP BY p.id ORDER BY p.created_at LIMIT 1"
        ))
        .bind(term.to_uppercase())
        .bind(term.to_lowercase())
        .fetch_optional(self.pool.pool())
        .await?;

        Ok(row.map(Product::from))
    }

    async fn update(&self, product: Product) -> Result<Option<Product>, StoreError> {
        let mut tx = self.pool.pool().begin().await?;

        let result = sqlx::query(
            "UPDATE products SET title = $2, price = $3, description = $4, slug = $5, \
             stock = $6, sizes = $7, gender = $8, tags = $9, user_id = $10 \
             WHERE id = $1",
        )
        .bind(product.id)
        .bind(&product.title)
        .bind(product.price)
        .bind(&product.description)
        .bind(&product.slug)
        .bind(product.stock)
        .bind(&product.sizes)
        .bind(&product.gender)
        .bind(&product.tags)
        .bind(product.user_id)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_write)?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query("DELETE FROM product_images WHERE product_id = $1")
            .bind(product.id)
            .execute(&mut *tx)
            .await?;
        Self::insert_images(&mut tx, product.id, &product.images).await?;
        tx.commit().await?;

        Ok(Some(product))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
