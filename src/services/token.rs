// Verification token service
// Issues and consumes the single-use secrets behind email verification and
// password reset. The raw token only ever travels in the email link; the
// database sees its SHA-256 hash.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::db::DieselPool;
use crate::models::verification_token::{NewVerificationToken, TokenPurpose, VerificationToken};
use crate::schema::verification_tokens;
use crate::utils::ApiError;

const TOKEN_BYTES: usize = 32;

/// A freshly minted token. `token` goes into the email link, `token_hash`
/// into the database. The raw value is never persisted.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub token: String,
    pub token_hash: String,
}

pub struct TokenService {
    pool: DieselPool,
    email_verification_ttl: Duration,
    password_reset_ttl: Duration,
    miss_delay: std::time::Duration,
}

impl TokenService {
    pub fn new(pool: DieselPool) -> Self {
        let config = crate::app_config::config();
        Self {
            pool,
            email_verification_ttl: Duration::seconds(
                config.tokens.email_verification_ttl as i64,
            ),
            password_reset_ttl: Duration::seconds(config.tokens.password_reset_ttl as i64),
            miss_delay: std::time::Duration::from_millis(config.tokens.miss_delay_ms),
        }
    }

    /// Generate a random token and its storage hash
    pub fn generate() -> TokenInfo {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);

        let token = URL_SAFE_NO_PAD.encode(bytes);
        let token_hash = Self::hash_token(&token);

        TokenInfo { token, token_hash }
    }

    /// SHA-256 hex digest of a raw token
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn ttl_for(&self, purpose: TokenPurpose) -> Duration {
        match purpose {
            TokenPurpose::EmailVerification => self.email_verification_ttl,
            TokenPurpose::PasswordReset => self.password_reset_ttl,
        }
    }

    /// Issue a token for a user. Any previous unconsumed token of the same
    /// purpose is invalidated so only the newest link works.
    pub async fn issue(&self, user_id: Uuid, purpose: TokenPurpose) -> Result<TokenInfo, ApiError> {
        let info = Self::generate();
        let expires_at = Utc::now() + self.ttl_for(purpose);

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| ApiError::Database(e.to_string()))?;

        diesel::delete(
            verification_tokens::table
                .filter(verification_tokens::user_id.eq(user_id))
                .filter(verification_tokens::purpose.eq(purpose.as_str()))
                .filter(verification_tokens::consumed_at.is_null()),
        )
        .execute(&mut conn)
        .await?;

        diesel::insert_into(verification_tokens::table)
            .values(NewVerificationToken::new(
                user_id,
                info.token_hash.clone(),
                purpose,
                expires_at,
            ))
            .execute(&mut conn)
            .await?;

        Ok(info)
    }

    /// Validate a presented token and mark it consumed, returning the owning
    /// user id. Expired, consumed, and unknown tokens all fail identically.
    pub async fn validate_and_consume(
        &self,
        token: &str,
        purpose: TokenPurpose,
    ) -> Result<Uuid, ApiError> {
        let presented_hash = Self::hash_token(token);
        let now = Utc::now();

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| ApiError::Database(e.to_string()))?;

        let candidates: Vec<VerificationToken> = verification_tokens::table
            .filter(verification_tokens::purpose.eq(purpose.as_str()))
            .filter(verification_tokens::consumed_at.is_null())
            .filter(verification_tokens::expires_at.gt(now))
            .select(VerificationToken::as_select())
            .load(&mut conn)
            .await?;

        // Constant-time comparison over the full candidate set. The
        // usability check repeats the SQL filters on the loaded rows.
        let mut matched: Option<VerificationToken> = None;
        for candidate in candidates {
            if candidate.is_usable(now)
                && bool::from(
                    candidate
                        .token_hash
                        .as_bytes()
                        .ct_eq(presented_hash.as_bytes()),
                )
            {
                matched = Some(candidate);
            }
        }

        let Some(row) = matched else {
            // Keep miss timing close to hit timing
            tokio::time::sleep(self.miss_delay).await;
            return Err(ApiError::InvalidToken);
        };

        let consumed = diesel::update(
            verification_tokens::table
                .filter(verification_tokens::id.eq(row.id))
                .filter(verification_tokens::consumed_at.is_null()),
        )
        .set(verification_tokens::consumed_at.eq(now))
        .execute(&mut conn)
        .await?;

        // A concurrent request may have consumed it first
        if consumed == 0 {
            return Err(ApiError::InvalidToken);
        }

        Ok(row.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_shape() {
        let info = TokenService::generate();

        // 32 bytes of entropy, base64url without padding
        assert_eq!(info.token.len(), 43);
        assert!(!info.token.contains('='));
        assert!(!info.token.contains('+'));
        assert!(!info.token.contains('/'));

        // SHA-256 hex digest
        assert_eq!(info.token_hash.len(), 64);
        assert!(info.token_hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_is_deterministic() {
        let info = TokenService::generate();
        assert_eq!(TokenService::hash_token(&info.token), info.token_hash);
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = TokenService::generate();
        let b = TokenService::generate();
        assert_ne!(a.token, b.token);
        assert_ne!(a.token_hash, b.token_hash);
    }

    #[test]
    fn test_hash_differs_from_token() {
        // The stored value must never equal the emailed value
        let info = TokenService::generate();
        assert_ne!(info.token, info.token_hash);
    }
}
