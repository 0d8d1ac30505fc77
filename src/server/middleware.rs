use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::AppState;
use crate::error::AppError;

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// Bearer token authentication middleware.
///
/// Resolves the token subject to a principal and attaches it to the request
/// extensions. Inactive users are rejected even with a valid token.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = {
        let token = extract_bearer_token(req.headers())
            .ok_or_else(|| AppError::Auth("Missing bearer token".to_string()))?;
        state.jwt.validate(token)?
    };

    let principal = state
        .directory
        .principals
        .find_by_id(claims.user_id())
        .await?
        .ok_or_else(|| AppError::Auth("Token not valid".to_string()))?;

    if !principal.is_active {
        tracing::warn!(user_id = %principal.id, "Inactive user presented a valid token");
        return Err(AppError::Auth("User is inactive, talk with an admin".to_string()));
    }

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
