//! Authentication and authorization extractors
//!
//! `AuthUser` validates the bearer token and yields the subject id.
//! `AdminUser` additionally re-reads the user record from the store and
//! enforces the admin flag. The re-read is deliberate: the token's cached
//! `admin` claim is never trusted, so a role revocation takes effect on the
//! very next request instead of waiting for token expiry.

use crate::auth::TokenError;
use crate::error::ApiError;
use crate::repositories::{UserRecord, UserRepository};
use crate::state::AppState;
use axum::{
    extract::FromRef,
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

/// Authenticated user extracted from a bearer token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Pull and verify the bearer token from request headers
fn verify_bearer(parts: &Parts, state: &AppState) -> Result<Uuid, ApiError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization format".to_string()))?;

    let claims = state.tokens().verify(token).map_err(|e| match e {
        TokenError::Expired => ApiError::TokenExpired,
        TokenError::Invalid => ApiError::TokenInvalid,
    })?;

    Uuid::parse_str(&claims.sub).map_err(|_| ApiError::TokenInvalid)
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let user_id = verify_bearer(parts, &app_state)?;
        Ok(AuthUser { user_id })
    }
}

/// Authenticated admin with the freshly loaded user record
///
/// Handlers that mutate anything behind the portal take this extractor.
pub struct AdminUser {
    pub user: UserRecord,
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let user_id = verify_bearer(parts, &app_state)?;

        // Fresh read: authorization is decided by the store, not the token
        let user = UserRepository::find_by_id(app_state.db(), user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

        if !user.is_admin {
            return Err(ApiError::Forbidden("Admin privileges required".to_string()));
        }

        Ok(AdminUser { user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_user_debug() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
        };
        let debug_str = format!("{:?}", user);
        assert!(debug_str.contains("AuthUser"));
    }
}
