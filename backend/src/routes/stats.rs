//! Admin dashboard statistics
//!
//! The canonical admin-gated endpoint: the `AdminUser` extractor performs
//! the token check plus the fresh admin-role read before the handler runs.

use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::repositories::UserRepository;
use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use backoffice_shared::types::StatsResponse;

/// Create stats routes
pub fn stats_routes() -> Router<AppState> {
    Router::new().route("/", get(stats))
}

/// Dashboard counters
///
/// GET /api/v1/stats
async fn stats(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<StatsResponse>> {
    let users_count = UserRepository::count_users(&state.db).await?;
    let admin_count = UserRepository::count_admins(&state.db).await?;

    Ok(Json(StatsResponse {
        users_count,
        admin_count,
    }))
}
