//! Authentication service: login, refresh, password change
//!
//! Control flow for login is throttle → resolve → verify → issue. The
//! throttle is consulted before any store or hash work, and a resolver miss
//! still runs a dummy verification so an unknown identifier and a wrong
//! password are latency-comparable and share one error shape.

use crate::auth::{LoginThrottle, PasswordService, ThrottleDecision, TokenError, TokenService};
use crate::error::ApiError;
use crate::repositories::{UserRecord, UserRepository};
use crate::services::CredentialResolver;
use backoffice_shared::types::{LoginResponse, SessionTokens, UserSummary};
use backoffice_shared::validation;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

/// Authentication service operations
pub struct AuthService;

impl AuthService {
    /// Authenticate with a handle or email plus password, issuing a token
    ///
    /// # Performance
    /// Password verification is offloaded to the blocking thread pool.
    pub async fn login(
        pool: &PgPool,
        tokens: &TokenService,
        throttle: &LoginThrottle,
        resolver: &CredentialResolver,
        identifier: &str,
        password: &str,
    ) -> Result<LoginResponse, ApiError> {
        validation::validate_identifier(identifier).map_err(ApiError::Validation)?;
        if password.is_empty() {
            return Err(ApiError::Validation("Password cannot be empty".to_string()));
        }

        let key = CredentialResolver::normalize(identifier);

        // Fail fast while blocked: no store lookup, no hash work, and no
        // credential-existence oracle for a throttled identifier
        if let ThrottleDecision::Blocked { retry_after_secs } = throttle.check(&key) {
            return Err(ApiError::Throttled { retry_after_secs });
        }

        let user = resolver.resolve(pool, identifier).await?;

        let valid = match &user {
            Some(user) => PasswordService::verify_async(
                password.to_string(),
                user.password_hash.clone(),
            )
            .await
            .map_err(ApiError::Internal)?,
            None => PasswordService::dummy_verify_async(password.to_string()).await,
        };

        if !valid {
            throttle.record_failure(&key);
            return Err(ApiError::InvalidCredentials);
        }

        // The match above only yields true for a present record
        let user = user.ok_or(ApiError::InvalidCredentials)?;

        throttle.record_success(&key);

        // Transparent hash upgrade (legacy bcrypt, outdated argon2 params).
        // Best effort: a failed upgrade must not fail the login.
        if PasswordService::needs_rehash(&user.password_hash) {
            match PasswordService::hash_async(password.to_string()).await {
                Ok(new_hash) => {
                    if let Err(e) =
                        UserRepository::update_password_hash(pool, user.id, &new_hash).await
                    {
                        warn!(user_id = %user.id, "Failed to store rehashed password: {}", e);
                    }
                }
                Err(e) => warn!(user_id = %user.id, "Failed to rehash password: {}", e),
            }
        }

        // Valid credentials but not an admin: distinct from bad credentials
        if !user.is_admin {
            return Err(ApiError::Forbidden("Admin privileges required".to_string()));
        }

        if let Err(e) = UserRepository::touch_last_active(pool, user.id).await {
            warn!(user_id = %user.id, "Failed to update last-active timestamp: {}", e);
        }

        Self::issue_response(tokens, &user)
    }

    /// Re-issue a token from a currently valid one
    ///
    /// The presented token must verify (not expired, signature intact) and
    /// the account must still exist and still be admin. The old token keeps
    /// its own expiry; stateless tokens cannot be revoked here.
    pub async fn refresh(
        pool: &PgPool,
        tokens: &TokenService,
        current_token: &str,
    ) -> Result<LoginResponse, ApiError> {
        let claims = tokens.verify(current_token).map_err(|e| match e {
            TokenError::Expired => ApiError::TokenExpired,
            TokenError::Invalid => ApiError::TokenInvalid,
        })?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::TokenInvalid)?;

        // Fresh read so a deleted or demoted account cannot mint new tokens
        let user = UserRepository::find_by_id(pool, user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

        if !user.is_admin {
            return Err(ApiError::Forbidden("Admin privileges required".to_string()));
        }

        Self::issue_response(tokens, &user)
    }

    /// Change a user's password after re-verifying the current one
    pub async fn change_password(
        pool: &PgPool,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        validation::validate_password(new_password).map_err(ApiError::Validation)?;

        let user = UserRepository::find_by_id(pool, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        let valid = PasswordService::verify_async(
            current_password.to_string(),
            user.password_hash.clone(),
        )
        .await
        .map_err(ApiError::Internal)?;

        if !valid {
            return Err(ApiError::InvalidCredentials);
        }

        let new_hash = PasswordService::hash_async(new_password.to_string())
            .await
            .map_err(ApiError::Internal)?;
        UserRepository::update_password_hash(pool, user.id, &new_hash).await?;

        Ok(())
    }

    /// Load the current user's summary
    pub async fn me(pool: &PgPool, user_id: Uuid) -> Result<UserSummary, ApiError> {
        let user = UserRepository::find_by_id(pool, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        Ok(Self::summarize(&user))
    }

    /// Build the public summary for a user record
    pub fn summarize(user: &UserRecord) -> UserSummary {
        UserSummary {
            id: user.id.to_string(),
            handle: user.handle.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            last_active_at: user.last_active_at,
            created_at: user.created_at,
        }
    }

    fn issue_response(tokens: &TokenService, user: &UserRecord) -> Result<LoginResponse, ApiError> {
        let access_token = tokens
            .issue(user.id, &user.handle, user.is_admin)
            .map_err(ApiError::Internal)?;

        Ok(LoginResponse {
            tokens: SessionTokens {
                access_token,
                token_type: "Bearer".to_string(),
                expires_in: tokens.token_lifetime_secs(),
            },
            user: Self::summarize(user),
        })
    }
}

#[cfg(test)]
mod tests {
    // DB-backed flows are covered in backend/tests/auth_integration_test.rs
}
