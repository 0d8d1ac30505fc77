//! Account registration, login and token refresh.

mod dto;
mod service;
mod validation;

pub use dto::{AuthResponse, LoginRequest, RegisterRequest};
pub use service::{AccountError, AccountService};
pub use validation::{normalize_email, validate_email, validate_password};
