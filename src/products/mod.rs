//! Product catalog.
//!
//! - `model`: product record and slug derivation
//! - `store`: persistence trait and paging window
//! - `memory`: DashMap-backed store
//! - `postgres`: sqlx-backed store
//! - `service`: validation and admin writes

mod dto;
mod memory;
mod model;
mod postgres;
mod service;
mod store;

use std::sync::Arc;

pub use dto::{CreateProductRequest, Pagination, UpdateProductRequest};
pub use memory::MemoryProductStore;
pub use model::{slugify, Product, GENDERS};
pub use postgres::PostgresProductStore;
pub use service::{ProductError, ProductService};
pub use store::{Page, ProductStore};

use crate::postgres::{PostgresPool, PostgresPoolError};

/// Build the product store on the same backend as the user directory.
///
/// Must run after the users table exists.
pub async fn create_product_store(
    pool: Option<&PostgresPool>,
) -> Result<Arc<dyn ProductStore>, PostgresPoolError> {
    let Some(pool) = pool else {
        tracing::info!(backend = "memory", "Product store initialized");
        return Ok(Arc::new(MemoryProductStore::new()));
    };

    let store = PostgresProductStore::new(pool.clone());
    store
        .ensure_schema()
        .await
        .map_err(|e| PostgresPoolError::ConnectionUnavailable(e.to_string()))?;

    tracing::info!(backend = "postgres", "Product store initialized");
    Ok(Arc::new(store))
}
