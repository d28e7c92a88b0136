// JWT access-token service
// Stateless HS256 tokens carrying the role claim the route gate relies on.
// No refresh rotation: sessions simply re-authenticate when the token lapses.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

use crate::models::user::{User, UserRole};

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("JWT encoding error: {0}")]
    EncodingError(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            ErrorKind::InvalidToken => JwtError::InvalidToken,
            _ => JwtError::EncodingError(err.to_string()),
        }
    }
}

/// Claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,   // User id
    pub email: String,
    pub role: String,  // "admin" | "resident"
    pub cluster_id: String,
    pub iat: u64,
    pub exp: u64,
    pub iss: String,
    pub aud: String,
    pub jti: String,
}

/// JWT configuration with pre-built keys
#[derive(Clone)]
pub struct JwtConfig {
    pub expiry: u64,
    pub audience: String,
    pub issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("expiry", &self.expiry)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("encoding_key", &"<redacted>")
            .field("decoding_key", &"<redacted>")
            .finish()
    }
}

impl JwtConfig {
    fn build_from_params(secret: &str, expiry: u64, audience: String, issuer: String) -> Self {
        Self {
            expiry,
            audience,
            issuer,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Create JWT config from centralized app configuration
    pub fn from_env() -> Self {
        let crate::app_config::JwtConfig {
            secret,
            expiry,
            audience,
            issuer,
        } = &crate::app_config::config().jwt;

        Self::build_from_params(secret, *expiry, audience.clone(), issuer.clone())
    }

    /// Deterministic config for tests, no env involved
    pub fn for_test() -> Self {
        Self::build_from_params(
            "test-secret-that-is-at-least-32-characters",
            3600,
            "test.komplekin.id".to_string(),
            "test.komplekin.id".to_string(),
        )
    }
}

/// JWT service issuing and validating access tokens
pub struct JwtService {
    config: JwtConfig,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    pub fn expiry_seconds(&self) -> u64 {
        self.config.expiry
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Issue an access token for an authenticated user
    pub fn generate_access_token(&self, user: &User) -> Result<String, JwtError> {
        let now = Self::now();
        let claims = AccessTokenClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.clone(),
            cluster_id: user.cluster_id.to_string(),
            iat: now,
            exp: now + self.config.expiry,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.config.encoding_key,
        )
        .map_err(JwtError::from)
    }

    /// Validate an access token and return its claims
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.audience.clone()]);
        validation.set_issuer(&[self.config.issuer.clone()]);

        let data = decode::<AccessTokenClaims>(token, &self.config.decoding_key, &validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            email: "warga@example.com".to_string(),
            password_hash: "$argon2id$irrelevant".to_string(),
            full_name: "Warga Uji".to_string(),
            role: role.as_str().to_string(),
            cluster_id: Uuid::new_v4(),
            phone: None,
            is_active: true,
            email_verified: true,
            email_verified_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let service = JwtService::new(JwtConfig::for_test());
        let user = test_user(UserRole::Resident);

        let token = service.generate_access_token(&user).unwrap();
        let claims = service.validate_access_token(&token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, "resident");
        assert_eq!(claims.cluster_id, user.cluster_id.to_string());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_role_claim_for_admin() {
        let service = JwtService::new(JwtConfig::for_test());
        let user = test_user(UserRole::Admin);

        let token = service.generate_access_token(&user).unwrap();
        let claims = service.validate_access_token(&token).unwrap();
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = JwtService::new(JwtConfig::for_test());
        assert!(service.validate_access_token("not.a.token").is_err());
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let issuing = JwtService::new(JwtConfig::build_from_params(
            "a-completely-different-secret-also-32-chars!",
            3600,
            "test.komplekin.id".to_string(),
            "test.komplekin.id".to_string(),
        ));
        let validating = JwtService::new(JwtConfig::for_test());

        let token = issuing
            .generate_access_token(&test_user(UserRole::Resident))
            .unwrap();
        assert!(validating.validate_access_token(&token).is_err());
    }
}
