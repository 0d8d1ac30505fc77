mod claims;
mod jwt;
mod password;

pub use claims::Claims;
pub use jwt::JwtService;
pub use password::PasswordHasher;
