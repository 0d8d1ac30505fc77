use std::sync::Arc;

use thiserror::Error;
use tokio::sync::OnceCell;

use crate::auth::{JwtService, PasswordHasher};
use crate::error::AppError;
use crate::metrics::AuthMetrics;
use crate::users::{NewUser, Principal, StoreError, UserStore};

use super::dto::{AuthResponse, LoginRequest, RegisterRequest};
use super::validation::{normalize_email, validate_registration};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Hashed once per service, never matched by a real login.
const DECOY_PASSWORD: &str = "decoy-password-for-unknown-accounts";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{0}")]
    Duplicate(String),

    /// Unknown email and wrong password are deliberately indistinguishable.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Store(StoreError),

    #[error("{0}")]
    Crypto(String),
}

impl From<StoreError> for AccountError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(detail) => AccountError::Duplicate(detail),
            other => AccountError::Store(other),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::Validation(_) => AppError::Validation(e.to_string()),
            AccountError::Duplicate(detail) => AppError::Conflict(detail),
            AccountError::InvalidCredentials => AppError::Auth(INVALID_CREDENTIALS.to_string()),
            AccountError::Store(e) => e.into(),
            AccountError::Crypto(msg) => AppError::Internal(msg),
        }
    }
}

/// Registration, login and token refresh.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    jwt: Arc<JwtService>,
    decoy_hash: Arc<OnceCell<String>>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, hasher: PasswordHasher, jwt: Arc<JwtService>) -> Self {
        Self {
            users,
            hasher,
            jwt,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    #[tracing::instrument(name = "accounts.register", skip_all)]
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AccountError> {
        let result = self.try_register(request).await;
        AuthMetrics::record_register(result.is_ok());
        result
    }

    async fn try_register(&self, request: RegisterRequest) -> Result<AuthResponse, AccountError> {
        let email = normalize_email(&request.email);

        let errors = validate_registration(&email, &request.password, &request.full_name);
        if !errors.is_empty() {
            return Err(AccountError::Validation(errors));
        }

        let password_hash = self
            .hasher
            .hash(&request.password)
            .await
            .map_err(|e| AccountError::Crypto(e.to_string()))?;

        let user = self
            .users
            .create(NewUser::with_default_roles(
                email,
                request.full_name.trim(),
                password_hash,
            ))
            .await?;

        tracing::info!(user_id = %user.id, "User registered");

        self.respond(user.principal())
    }

    #[tracing::instrument(name = "accounts.login", skip_all)]
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AccountError> {
        let result = self.try_login(request).await;
        AuthMetrics::record_login(result.is_ok());
        result
    }

    async fn try_login(&self, request: LoginRequest) -> Result<AuthResponse, AccountError> {
        let email = normalize_email(&request.email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            tracing::debug!("Login for unknown email");
            self.verify_decoy(&request.password).await;
            return Err(AccountError::InvalidCredentials);
        };

        if !self
            .hasher
            .verify(&request.password, &user.password_hash)
            .await
        {
            tracing::debug!(user_id = %user.id, "Login with wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User logged in");

        self.respond(user.principal())
    }

    /// Unknown emails pay the same bcrypt cost as wrong passwords.
    async fn verify_decoy(&self, password: &str) {
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| self.hasher.hash(DECOY_PASSWORD))
            .await;

        match decoy {
            Ok(hash) => {
                self.hasher.verify(password, hash).await;
            }
            Err(e) => tracing::warn!(error = %e, "Failed to prepare decoy password hash"),
        }
    }

    /// Re-issue a token for an already authenticated principal.
    pub fn refresh(&self, principal: Principal) -> Result<AuthResponse, AccountError> {
        self.respond(principal)
    }

    fn respond(&self, user: Principal) -> Result<AuthResponse, AccountError> {
        let token = self
            .jwt
            .issue(&user)
            .map_err(|e| AccountError::Crypto(e.to_string()))?;

        Ok(AuthResponse { user, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use crate::users::MemoryUserStore;

    fn service() -> AccountService {
        AccountService::new(
            Arc::new(MemoryUserStore::new()),
            PasswordHasher::new(4),
            Arc::new(JwtService::new(&JwtConfig::with_secret("accounts-test"))),
        )
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "Abc123".to_string(),
            full_name: "Ann Bee".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_normalizes_and_issues_token() {
        let service = service();

        let response = service
            .register(register_request("  Ann@Shop.Test"))
            .await
            .unwrap();

        assert_eq!(response.user.email, "ann@shop.test");
        assert!(response.user.is_active);
        assert_eq!(response.user.roles.to_strings(), vec!["user"]);
        assert!(!response.token.is_empty());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let service = service();
        service.register(register_request("ann@shop.test")).await.unwrap();

        let err = service
            .register(register_request("ANN@shop.test"))
            .await
            .unwrap_err();

        assert!(matches!(err, AccountError::Duplicate(_)));
        let app: AppError = err.into();
        assert_eq!(app.code(), "DUPLICATE");
    }

    #[tokio::test]
    async fn test_register_validation() {
        let service = service();
        let err = service
            .register(RegisterRequest {
                email: "nope".to_string(),
                password: "weak".to_string(),
                full_name: String::new(),
            })
            .await
            .unwrap_err();

        match err {
            AccountError::Validation(errors) => assert_eq!(errors.len(), 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let service = service();
        service.register(register_request("ann@shop.test")).await.unwrap();

        let wrong_password = service
            .login(LoginRequest {
                email: "ann@shop.test".to_string(),
                password: "Wrong999".to_string(),
            })
            .await
            .unwrap_err();
        let unknown_email = service
            .login(LoginRequest {
                email: "bob@shop.test".to_string(),
                password: "Abc123".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert!(matches!(wrong_password, AccountError::InvalidCredentials));
        assert!(matches!(unknown_email, AccountError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_success() {
        let service = service();
        let registered = service.register(register_request("ann@shop.test")).await.unwrap();

        let response = service
            .login(LoginRequest {
                email: "Ann@Shop.Test".to_string(),
                password: "Abc123".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.user.id, registered.user.id);
    }

    #[tokio::test]
    async fn test_unknown_email_still_checks_a_password() {
        let service = service();
        assert!(service.decoy_hash.get().is_none());

        let err = service
            .login(LoginRequest {
                email: "nobody@shop.test".to_string(),
                password: "Abc123".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AccountError::InvalidCredentials));
        let decoy = service.decoy_hash.get().unwrap();
        // same work factor as real password hashes
        assert!(decoy.starts_with("$2b$04$"));
    }
}
