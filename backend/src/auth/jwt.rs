//! Session token issuance and verification
//!
//! Tokens are HS256 JWTs carrying the subject id, handle, and admin flag.
//! The payload is integrity-protected, not encrypted, so it must never
//! carry secrets. Keys are pre-computed once at startup and shared via Arc.

use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Session token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Handle at issuance time (informational; never trusted for authorization)
    pub handle: String,
    /// Admin flag at issuance time (informational; never trusted for authorization)
    pub admin: bool,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Unique token id; makes re-issuance within the same second produce a
    /// distinct token and leaves room for a future denylist
    pub jti: String,
}

/// Token verification failure
///
/// A forged or corrupted signature and an expired-but-authentic token are
/// distinguished: only the latter should prompt a client to re-authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
}

/// Pre-computed JWT keys for efficient token operations
/// These are expensive to create, so we cache them in AppState
#[derive(Clone)]
pub struct JwtKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl JwtKeys {
    /// Create new JWT keys from secret
    /// This should be called once at startup
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }

    pub fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }

    pub fn decoding(&self) -> &DecodingKey {
        &self.decoding
    }
}

/// Token service for issue/verify operations
///
/// Design: Uses pre-computed keys to avoid expensive key derivation
/// on every request. Keys are wrapped in Arc for cheap cloning.
#[derive(Clone)]
pub struct TokenService {
    keys: JwtKeys,
    token_lifetime_secs: i64,
}

impl TokenService {
    /// Create a new token service with pre-computed keys
    ///
    /// Call this once at application startup and store in AppState.
    pub fn new(secret: &str, token_lifetime_secs: i64) -> Self {
        Self {
            keys: JwtKeys::new(secret),
            token_lifetime_secs,
        }
    }

    /// Issue a session token for a user
    ///
    /// Expiry is issued-at plus the configured lifetime. Refresh is plain
    /// re-issuance: the old token keeps its own expiry and stays valid.
    pub fn issue(&self, user_id: Uuid, handle: &str, admin: bool) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.token_lifetime_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            handle: handle.to_string(),
            admin,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, self.keys.encoding())
            .map_err(|e| anyhow::anyhow!("Failed to issue token: {}", e))
    }

    /// Verify a token and return its claims
    ///
    /// The signature is checked before expiry, so a tampered token reports
    /// `Invalid` even when its embedded expiry has also passed.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        // No leeway: a token is expired the second its exp passes
        validation.leeway = 0;

        match decode::<Claims>(token, self.keys.decoding(), &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                _ => Err(TokenError::Invalid),
            },
        }
    }

    /// Get the configured token lifetime in seconds
    #[inline]
    pub fn token_lifetime_secs(&self) -> i64 {
        self.token_lifetime_secs
    }

    /// Get the pre-computed keys (for sharing)
    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> TokenService {
        TokenService::new("test-secret", 3600)
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let service = create_test_service();
        let user_id = Uuid::new_v4();

        let token = service.issue(user_id, "alice", true).unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.handle, "alice");
        assert!(claims.admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_expired_token_reports_expired() {
        let service = TokenService::new("test-secret", -10);
        let user_id = Uuid::new_v4();

        let token = service.issue(user_id, "alice", false).unwrap();
        assert_eq!(service.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_tampered_signature_reports_invalid_not_expired() {
        // Expired lifetime AND a corrupted signature: forgery wins
        let service = TokenService::new("test-secret", -10);
        let user_id = Uuid::new_v4();

        let mut token = service.issue(user_id, "alice", false).unwrap();
        let last = token.pop().unwrap();
        token.push(if last == 'A' { 'B' } else { 'A' });

        assert_eq!(service.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_garbage_token_reports_invalid() {
        let service = create_test_service();
        assert_eq!(
            service.verify("not.a.token"),
            Err(TokenError::Invalid)
        );
        assert_eq!(service.verify(""), Err(TokenError::Invalid));
    }

    #[test]
    fn test_wrong_secret_reports_invalid() {
        let service = create_test_service();
        let other = TokenService::new("another-secret", 3600);
        let token = other.issue(Uuid::new_v4(), "alice", true).unwrap();

        assert_eq!(service.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_reissued_token_differs() {
        let service = create_test_service();
        let user_id = Uuid::new_v4();

        // jti makes back-to-back issuance distinct even within one second
        let first = service.issue(user_id, "alice", true).unwrap();
        let second = service.issue(user_id, "alice", true).unwrap();
        assert_ne!(first, second);
        assert!(service.verify(&first).is_ok());
        assert!(service.verify(&second).is_ok());
    }

    #[test]
    fn test_service_is_clone_cheap() {
        let service = create_test_service();
        let _cloned = service.clone(); // Should be cheap due to Arc
    }
}
