//! API layer - HTTP endpoint handlers organized by domain.

mod auth;
mod files;
mod health;
mod metrics;
mod presence;
mod products;
mod routes;

pub use auth::{login, me, private_route, register, PrivateResponse};
pub use files::{product_image, upload_product_image, UploadResponse};
pub use health::{health, stats};
pub use metrics::prometheus_metrics;
pub use presence::{list_presence, PresenceEntry, PresenceResponse};
pub use products::{create_product, delete_product, get_product, list_products, update_product};
pub use routes::api_routes;
