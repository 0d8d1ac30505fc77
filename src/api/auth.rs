//! Account endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::access::CurrentUser;
use crate::accounts::{AuthResponse, LoginRequest, RegisterRequest};
use crate::error::Result;
use crate::server::AppState;
use crate::users::Principal;

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let response = state.accounts.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    Ok(Json(state.accounts.login(request).await?))
}

/// GET /api/v1/auth/me - the caller with a fresh token
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<AuthResponse>> {
    Ok(Json(state.accounts.refresh(user)?))
}

#[derive(Debug, Serialize)]
pub struct PrivateResponse {
    pub ok: bool,
    pub message: String,
    pub user: Principal,
}

/// GET /api/v1/auth/private - admin only
pub async fn private_route(CurrentUser(user): CurrentUser) -> Json<PrivateResponse> {
    Json(PrivateResponse {
        ok: true,
        message: format!("Hello {}", user.display_name()),
        user,
    })
}
