//! API request and response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Login request
///
/// The identifier may be either a handle or an email address; the backend
/// resolves it in that order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

/// Token refresh request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub token: String,
}

/// Password change request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Session token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// User summary returned alongside tokens and from /me
///
/// `email` is the stored form: plaintext in plaintext-indexed deployments,
/// the opaque at-rest value when email encryption is enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub handle: String,
    pub email: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Login / refresh response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub tokens: SessionTokens,
    pub user: UserSummary,
}

/// Admin dashboard counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub users_count: i64,
    pub admin_count: i64,
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}
