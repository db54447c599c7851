//! Authentication routes
//!
//! Endpoints for login, token refresh, current-user lookup, and password
//! change. All real logic lives in `services::AuthService`; these handlers
//! are deliberately thin.

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::AuthService;
use crate::state::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use backoffice_shared::types::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RefreshRequest, UserSummary,
};

/// Create auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/me", get(me))
        .route("/change-password", post(change_password))
}

/// Login with handle or email and password
///
/// POST /api/v1/auth/login
///
/// # Performance
/// Password verification is offloaded to blocking thread pool.
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let response = AuthService::login(
        &state.db,
        state.tokens(),
        state.throttle(),
        state.resolver(),
        &req.identifier,
        &req.password,
    )
    .await?;
    Ok(Json(response))
}

/// Re-issue a token from a currently valid one
///
/// POST /api/v1/auth/refresh
async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let response = AuthService::refresh(&state.db, state.tokens(), &req.token).await?;
    Ok(Json(response))
}

/// Get current user summary (requires authentication)
///
/// GET /api/v1/auth/me
async fn me(State(state): State<AppState>, auth_user: AuthUser) -> ApiResult<Json<UserSummary>> {
    let summary = AuthService::me(&state.db, auth_user.user_id).await?;
    Ok(Json(summary))
}

/// Change the current user's password
///
/// POST /api/v1/auth/change-password
async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    AuthService::change_password(
        &state.db,
        auth_user.user_id,
        &req.current_password,
        &req.new_password,
    )
    .await?;
    Ok(Json(serde_json::json!({ "message": "Password updated" })))
}
