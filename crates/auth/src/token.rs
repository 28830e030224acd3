//! HS256 bearer token issuing and verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use warden_core::UserId;

use crate::claims::{validate_claims, JwtClaims, TokenValidationError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed or badly signed token")]
    Invalid,

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Verifies bearer tokens and yields their claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

/// Shared-secret (HMAC-SHA256) token issuer and validator.
pub struct Hs256JwtValidator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>, ttl_secs: i64) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    /// Mint a token for a verified user, valid from `now` for the configured ttl.
    pub fn issue(&self, user_id: UserId, email: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = JwtClaims::new(user_id, email, now, self.ttl_secs);
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    TokenError::Claims(TokenValidationError::Expired)
                }
                _ => TokenError::Invalid,
            }
        })?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    const SECRET: &str = "test-secret-key-minimum-32-characters-long";

    #[test]
    fn issued_token_validates_and_carries_identity() {
        let tokens = Hs256JwtValidator::new(SECRET, 3600);
        let user_id = UserId::new();
        let now = Utc::now();

        let token = tokens.issue(user_id, "a@x.com", now).unwrap();
        let claims = tokens.validate(&token, now).unwrap();

        assert_eq!(claims.id, user_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn expired_token_is_rejected_despite_valid_signature() {
        let tokens = Hs256JwtValidator::new(SECRET, 60);
        let issued = Utc::now() - Duration::hours(2);
        let token = tokens.issue(UserId::new(), "a@x.com", issued).unwrap();

        let err = tokens.validate(&token, Utc::now()).unwrap_err();
        assert_eq!(err, TokenError::Claims(TokenValidationError::Expired));
    }

    #[test]
    fn token_from_another_secret_is_invalid() {
        let ours = Hs256JwtValidator::new(SECRET, 60);
        let theirs = Hs256JwtValidator::new("some-other-secret-that-is-long-enough", 60);
        let token = theirs.issue(UserId::new(), "a@x.com", Utc::now()).unwrap();

        assert_eq!(ours.validate(&token, Utc::now()).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn garbage_is_invalid() {
        let tokens = Hs256JwtValidator::new(SECRET, 60);
        assert_eq!(tokens.validate("not.a.jwt", Utc::now()).unwrap_err(), TokenError::Invalid);
    }
}
