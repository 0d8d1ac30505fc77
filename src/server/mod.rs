mod app;
mod middleware;
mod state;

pub use app::create_app;
pub use middleware::{authenticate, extract_bearer_token};
pub use state::AppState;
