//! Route-level role enforcement.
//!
//! A route declares its roles with [`require_roles`]; the declaration travels
//! as a [`RequiredRoles`] request extension and [`role_guard`] compares it
//! with the roles of the [`Principal`] that authentication attached.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
    Extension,
};

use crate::error::AppError;
use crate::metrics::AccessMetrics;
use crate::users::Principal;

use super::decision::{authorize, AccessError};
use super::roles::RoleSet;

/// Roles a route requires. Holding any one of them is enough.
#[derive(Debug, Clone, Default)]
pub struct RequiredRoles(pub RoleSet);

/// Attach a role requirement to a route.
///
/// The guard sits inside the route, so authentication layered on the
/// enclosing router runs first.
pub fn require_roles<S>(route: MethodRouter<S>, roles: impl Into<RoleSet>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route
        .route_layer(middleware::from_fn(role_guard))
        .route_layer(Extension(RequiredRoles(roles.into())))
}

/// Middleware applying the access decision to the current request.
pub async fn role_guard(req: Request, next: Next) -> Result<Response, AppError> {
    let required = req
        .extensions()
        .get::<RequiredRoles>()
        .map(|r| r.0.clone())
        .unwrap_or_default();

    let result = authorize(
        &required,
        req.extensions().get::<Principal>().map(|p| &p.roles),
    );

    match &result {
        Ok(()) => AccessMetrics::record_allowed(),
        Err(AccessError::MissingPrincipal) => {
            AccessMetrics::record_missing_principal();
            tracing::error!(
                path = %req.uri().path(),
                "Role check reached without an authenticated principal"
            );
        }
        Err(AccessError::Forbidden { required }) => {
            AccessMetrics::record_forbidden();
            tracing::warn!(path = %req.uri().path(), required = %required, "Access denied");
        }
    }

    result?;
    Ok(next.run(req).await)
}

/// The authenticated principal of the current request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Principal);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AccessError::MissingPrincipal.into())
    }
}
