//! Catalog endpoints. Reads are public, writes need an admin.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::access::CurrentUser;
use crate::error::{AppError, Result};
use crate::products::{CreateProductRequest, Pagination, Product, UpdateProductRequest};
use crate::server::AppState;

/// POST /api/v1/products
pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state.products.create(request, &user).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /api/v1/products?limit=&offset=
pub async fn list_products(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<Product>>> {
    let page = pagination.into_page().map_err(AppError::Validation)?;
    Ok(Json(state.products.list(page).await?))
}

/// GET /api/v1/products/{term} - by id, title or slug
pub async fn get_product(
    State(state): State<AppState>,
    Path(term): Path<String>,
) -> Result<Json<Product>> {
    Ok(Json(state.products.find(&term).await?))
}

/// PATCH /api/v1/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<Json<Product>> {
    Ok(Json(state.products.update(id, request, &user).await?))
}

/// DELETE /api/v1/products/{id}
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.products.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
