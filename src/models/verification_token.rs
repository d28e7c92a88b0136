// Verification token database model
// Single-use, time-limited secrets for email verification and password reset.
// Only the SHA-256 hash of a token is ever stored.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::schema::verification_tokens;

/// What a token authorizes once presented
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::EmailVerification => "email_verification",
            TokenPurpose::PasswordReset => "password_reset",
        }
    }
}

impl FromStr for TokenPurpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email_verification" => Ok(TokenPurpose::EmailVerification),
            "password_reset" => Ok(TokenPurpose::PasswordReset),
            _ => Err(format!("Invalid token purpose: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = verification_tokens)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VerificationToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub purpose: String,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl VerificationToken {
    /// Whether this token can still be redeemed at `now`. A consumed
    /// token never validates again; neither does an expired one,
    /// consumed or not.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.consumed_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = verification_tokens)]
pub struct NewVerificationToken {
    pub user_id: Uuid,
    pub token_hash: String,
    pub purpose: String,
    pub expires_at: DateTime<Utc>,
}

impl NewVerificationToken {
    pub fn new(
        user_id: Uuid,
        token_hash: String,
        purpose: TokenPurpose,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            token_hash,
            purpose: purpose.as_str().to_string(),
            expires_at,
        }
    }
}

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    #[validate(length(min = 32, max = 64, message = "Invalid verification token format"))]
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 32, max = 64, message = "Invalid reset token format"))]
    pub token: String,

    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub new_password: String,

    pub confirm_password: String,
}

impl ResetPasswordRequest {
    /// Validate that passwords match
    pub fn validate_passwords_match(&self) -> Result<(), String> {
        if self.new_password != self.confirm_password {
            return Err("Passwords do not match".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purpose_round_trip() {
        assert_eq!(
            TokenPurpose::from_str("email_verification").unwrap(),
            TokenPurpose::EmailVerification
        );
        assert_eq!(
            TokenPurpose::from_str("password_reset").unwrap(),
            TokenPurpose::PasswordReset
        );
        assert!(TokenPurpose::from_str("magic_link").is_err());
    }

    fn token(expires_at: DateTime<Utc>, consumed_at: Option<DateTime<Utc>>) -> VerificationToken {
        VerificationToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "a".repeat(64),
            purpose: TokenPurpose::PasswordReset.as_str().to_string(),
            expires_at,
            consumed_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_fresh_token_is_usable() {
        let now = Utc::now();
        assert!(token(now + chrono::Duration::hours(1), None).is_usable(now));
    }

    #[test]
    fn test_consumed_token_never_validates_again() {
        let now = Utc::now();
        let consumed = token(
            now + chrono::Duration::hours(1),
            Some(now - chrono::Duration::minutes(5)),
        );
        assert!(!consumed.is_usable(now));
    }

    #[test]
    fn test_expired_token_never_validates() {
        let now = Utc::now();
        let expired = token(now - chrono::Duration::seconds(1), None);
        assert!(!expired.is_usable(now));

        // Expiry wins regardless of consumption state
        let expired_and_consumed = token(now - chrono::Duration::hours(1), Some(now));
        assert!(!expired_and_consumed.is_usable(now));
    }

    #[test]
    fn test_password_confirmation() {
        let req = ResetPasswordRequest {
            token: "a".repeat(43),
            new_password: "S3cure-enough!".to_string(),
            confirm_password: "S3cure-enough!".to_string(),
        };
        assert!(req.validate_passwords_match().is_ok());

        let mismatched = ResetPasswordRequest {
            confirm_password: "different".to_string(),
            ..req
        };
        assert!(mismatched.validate_passwords_match().is_err());
    }
}
