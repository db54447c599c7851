//! Password hashing using argon2
//!
//! New hashes are Argon2id with a per-call random salt embedded in the PHC
//! output, so verification is self-contained. Legacy records carry bcrypt
//! hashes; those still verify and are transparently upgraded on the next
//! successful login (see `needs_rehash`).
//!
//! # Performance Considerations
//!
//! Argon2 is intentionally CPU-intensive. For async contexts, use the
//! `_async` variants which run on the blocking thread pool.

use anyhow::Result;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params,
};
use once_cell::sync::Lazy;

/// Fixed hash used to equalize latency when no user record was found.
/// Computed once; the input is irrelevant because the result is discarded.
static DUMMY_HASH: Lazy<String> = Lazy::new(|| {
    PasswordService::hash("dummy-password-for-latency-equalization")
        .expect("argon2 hashing of a fixed input cannot fail")
});

/// Password hashing service
///
/// Uses Argon2id which provides resistance against both side-channel and
/// GPU-based attacks. Digest comparison inside the argon2 crate is
/// constant-time.
pub struct PasswordService;

impl PasswordService {
    /// Hash a password using argon2 (blocking operation)
    ///
    /// # Performance Note
    /// This is CPU-intensive. For async contexts, use `hash_async`.
    pub fn hash(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
        Ok(hash.to_string())
    }

    /// Hash a password asynchronously (non-blocking)
    ///
    /// Spawns the CPU-intensive work on a blocking thread pool,
    /// preventing it from blocking the async runtime.
    pub async fn hash_async(password: String) -> Result<String> {
        tokio::task::spawn_blocking(move || Self::hash(&password))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    /// Verify a password against a stored hash (blocking operation)
    ///
    /// Dispatches on the hash format: `$argon2*` via the argon2 crate,
    /// `$2*` via bcrypt for legacy records. A malformed stored hash is an
    /// `Err`, never `Ok(false)`, so operators can tell corruption apart
    /// from a wrong password.
    pub fn verify(password: &str, hash: &str) -> Result<bool> {
        if hash.starts_with("$2") {
            return bcrypt::verify(password, hash)
                .map_err(|e| anyhow::anyhow!("Invalid bcrypt hash: {}", e));
        }

        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid hash format: {}", e))?;
        let argon2 = Argon2::default();
        match argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(anyhow::anyhow!("Hash verification failed: {}", e)),
        }
    }

    /// Verify a password asynchronously (non-blocking)
    ///
    /// Spawns the CPU-intensive work on a blocking thread pool.
    pub async fn verify_async(password: String, hash: String) -> Result<bool> {
        tokio::task::spawn_blocking(move || Self::verify(&password, &hash))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    /// Whether a stored hash should be replaced after a successful login
    ///
    /// True for legacy bcrypt hashes and for argon2 hashes produced with
    /// cost parameters different from the current defaults.
    pub fn needs_rehash(hash: &str) -> bool {
        if hash.starts_with("$2") {
            return true;
        }
        let Ok(parsed) = PasswordHash::new(hash) else {
            // Malformed hashes are reported by verify(); nothing to upgrade
            return false;
        };
        if parsed.algorithm.as_str() != Algorithm::Argon2id.as_str() {
            return true;
        }
        match Params::try_from(&parsed) {
            Ok(params) => {
                params.m_cost() != Params::DEFAULT.m_cost()
                    || params.t_cost() != Params::DEFAULT.t_cost()
                    || params.p_cost() != Params::DEFAULT.p_cost()
            }
            Err(_) => true,
        }
    }

    /// Burn the same CPU as a real verification, then report a mismatch
    ///
    /// Used when credential resolution found no record, so that an unknown
    /// identifier and a wrong password take comparable time.
    pub fn dummy_verify(password: &str) -> bool {
        let _ = Self::verify(password, &DUMMY_HASH);
        false
    }

    /// Async variant of `dummy_verify`
    pub async fn dummy_verify_async(password: String) -> bool {
        tokio::task::spawn_blocking(move || Self::dummy_verify(&password))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "secure_password_123";
        let hash = PasswordService::hash(password).unwrap();

        assert!(PasswordService::verify(password, &hash).unwrap());
        assert!(!PasswordService::verify("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_different_hashes_for_same_password() {
        let password = "test_password";
        let hash1 = PasswordService::hash(password).unwrap();
        let hash2 = PasswordService::hash(password).unwrap();

        // Hashes should be different due to random salt
        assert_ne!(hash1, hash2);

        // But both should verify correctly
        assert!(PasswordService::verify(password, &hash1).unwrap());
        assert!(PasswordService::verify(password, &hash2).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error_not_mismatch() {
        let result = PasswordService::verify("anything", "not-a-phc-string");
        assert!(result.is_err());
    }

    #[test]
    fn test_legacy_bcrypt_verifies() {
        // Low cost keeps the test fast; format dispatch is what matters
        let hash = bcrypt::hash("legacy_password", 4).unwrap();

        assert!(PasswordService::verify("legacy_password", &hash).unwrap());
        assert!(!PasswordService::verify("wrong", &hash).unwrap());
    }

    #[test]
    fn test_bcrypt_needs_rehash_argon2_does_not() {
        let bcrypt_hash = bcrypt::hash("pw", 4).unwrap();
        assert!(PasswordService::needs_rehash(&bcrypt_hash));

        let argon2_hash = PasswordService::hash("pw").unwrap();
        assert!(!PasswordService::needs_rehash(&argon2_hash));
    }

    #[test]
    fn test_dummy_verify_always_false() {
        assert!(!PasswordService::dummy_verify("any-password"));
        assert!(!PasswordService::dummy_verify(""));
    }

    #[tokio::test]
    async fn test_async_hash_and_verify() {
        let password = "async_test_password".to_string();
        let hash = PasswordService::hash_async(password.clone()).await.unwrap();

        assert!(PasswordService::verify_async(password.clone(), hash.clone())
            .await
            .unwrap());
        assert!(!PasswordService::verify_async("wrong".to_string(), hash)
            .await
            .unwrap());
    }
}
