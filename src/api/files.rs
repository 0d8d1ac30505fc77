//! Product image upload and download.

use axum::{
    extract::{Multipart, Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::{AppError, Result};
use crate::files::{image_extension, FileError};
use crate::metrics::CatalogMetrics;
use crate::server::AppState;

/// Multipart field carrying the image
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub secure_url: String,
}

/// POST /api/v1/files/product - admin only
pub async fn upload_product_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    let result = store_upload(&state, multipart).await;
    CatalogMetrics::record_upload(result.is_ok());
    Ok((StatusCode::CREATED, Json(result?)))
}

async fn store_upload(state: &AppState, mut multipart: Multipart) -> Result<UploadResponse> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let extension = field
            .content_type()
            .and_then(image_extension)
            .ok_or(FileError::NotAnImage)?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        let stored = state.images.save(extension, &bytes).await?;
        tracing::info!(name = %stored.name, size = bytes.len(), "Product image uploaded");
        return Ok(UploadResponse {
            secure_url: stored.secure_url,
        });
    }

    Err(FileError::NotAnImage.into())
}

/// GET /api/v1/files/product/{image_name}
pub async fn product_image(
    State(state): State<AppState>,
    Path(image_name): Path<String>,
    request: Request,
) -> Result<Response> {
    let path = state.images.resolve(&image_name).await?;

    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => Ok(response.into_response()),
        Err(never) => match never {},
    }
}
