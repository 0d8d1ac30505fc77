use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::config::JwtConfig;
use crate::error::AppError;
use crate::users::Principal;

use super::Claims;

/// Signs and verifies HS256 access tokens.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: Option<String>,
    audience: Option<String>,
    expires_in_seconds: i64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::default();
        let mut required = vec!["exp", "sub"];

        if let Some(ref issuer) = config.issuer {
            validation.set_issuer(&[issuer]);
            required.push("iss");
        }

        if let Some(ref audience) = config.audience {
            validation.set_audience(&[audience]);
            required.push("aud");
        }

        validation.set_required_spec_claims(&required);

        Self {
            encoding_key,
            decoding_key,
            validation,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            expires_in_seconds: i64::try_from(config.expires_in_seconds).unwrap_or(i64::MAX),
        }
    }

    /// Issue a token for `principal`.
    pub fn issue(&self, principal: &Principal) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: principal.id.clone(),
            exp: now.saturating_add(self.expires_in_seconds),
            iat: now,
            email: Some(principal.email.clone()),
            roles: principal.roles.to_strings(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }
}
