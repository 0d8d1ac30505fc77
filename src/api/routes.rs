use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::access::{require_roles, ValidRole};
use crate::server::{authenticate, AppState};

use super::auth::{login, me, private_route, register};
use super::files::{product_image, upload_product_image};
use super::health::{health, stats};
use super::metrics::prometheus_metrics;
use super::presence::list_presence;
use super::products::{create_product, delete_product, get_product, list_products, update_product};

pub fn api_routes(state: AppState) -> Router<AppState> {
    let admin = [ValidRole::Admin].as_slice();
    let max_upload_bytes = state.settings.files.max_upload_bytes;

    // Authenticated routes; role requirements sit inside authentication
    let protected = Router::new()
        .route("/auth/me", get(me))
        .route("/auth/private", require_roles(get(private_route), admin))
        .route(
            "/presence",
            require_roles(
                get(list_presence),
                [ValidRole::Admin, ValidRole::SuperUser].as_slice(),
            ),
        )
        .route("/products", require_roles(post(create_product), admin))
        .route(
            "/products/{id}",
            require_roles(patch(update_product).delete(delete_product), admin),
        )
        .route(
            "/files/product",
            require_roles(post(upload_product_image), admin)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route_layer(middleware::from_fn_with_state(state, authenticate));

    // Public catalog reads share paths with the admin writes above
    let catalog = Router::new()
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
        .route("/files/product/{image_name}", get(product_image));

    Router::new()
        // Health & Stats
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        .nest(
            "/api/v1",
            Router::new()
                .route("/auth/register", post(register))
                .route("/auth/login", post(login))
                .merge(catalog)
                .merge(protected),
        )
}
