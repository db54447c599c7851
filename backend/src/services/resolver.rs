//! Credential resolution: login identifier to user record
//!
//! Resolution order is handle first, then email. Deployments that encrypt
//! emails at rest cannot be queried by plaintext, so the email path runs in
//! one of two configured modes:
//!
//! - `plaintext`: direct equality against the stored email.
//! - `blinded` (default): a deterministic HMAC-SHA-256 of the normalized
//!   email, stored alongside the ciphertext at write time, is queried
//!   instead. This avoids a decrypt-and-compare scan and keeps plaintext
//!   emails out of query parameters and logs.

use crate::config::{EmailLookupConfig, EmailLookupMode};
use crate::repositories::{UserRecord, UserRepository};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use sqlx::PgPool;
use validator::ValidateEmail;

type HmacSha256 = Hmac<Sha256>;

/// Maps a login identifier (handle or email) to a unique user record
#[derive(Clone)]
pub struct CredentialResolver {
    mode: EmailLookupMode,
    blind_key: String,
}

impl CredentialResolver {
    pub fn new(config: &EmailLookupConfig) -> Self {
        Self {
            mode: config.mode,
            blind_key: config.blind_key.clone(),
        }
    }

    /// Normalize a login identifier: trim and case-fold
    pub fn normalize(identifier: &str) -> String {
        identifier.trim().to_lowercase()
    }

    /// Derive the deterministic blinded lookup token for a normalized email
    ///
    /// Write paths (user provisioning) must use the same derivation so the
    /// stored token matches at login time.
    pub fn blinded_email_token(key: &str, normalized_email: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(key.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(normalized_email.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Token derivation bound to this resolver's configured key
    pub fn email_token(&self, email: &str) -> String {
        Self::blinded_email_token(&self.blind_key, &Self::normalize(email))
    }

    /// Resolve a login identifier to a user record
    ///
    /// Read-only; the email path is only attempted for email-shaped
    /// identifiers, which keeps one store round-trip off the common
    /// handle-login case.
    pub async fn resolve(
        &self,
        pool: &PgPool,
        identifier: &str,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        let normalized = Self::normalize(identifier);

        if let Some(user) = UserRepository::find_by_handle(pool, &normalized).await? {
            return Ok(Some(user));
        }

        if !normalized.validate_email() {
            return Ok(None);
        }

        match self.mode {
            EmailLookupMode::Plaintext => UserRepository::find_by_email(pool, &normalized).await,
            EmailLookupMode::Blinded => {
                let token = Self::blinded_email_token(&self.blind_key, &normalized);
                UserRepository::find_by_email_token(pool, &token).await
            }
        }
    }
}
