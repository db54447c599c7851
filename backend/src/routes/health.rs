//! Health probe endpoints
//!
//! - /health - basic process health
//! - /health/ready - readiness: verifies the credential store is reachable
//! - /health/live - liveness: OK whenever the server answers

use crate::{db, state::AppState};
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

/// Probe response body
#[derive(Serialize)]
pub struct ProbeResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreCheck>,
}

/// Result of the credential store check
#[derive(Serialize)]
pub struct StoreCheck {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Basic health check endpoint
pub async fn health_check() -> Json<ProbeResponse> {
    Json(ProbeResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        store: None,
    })
}

/// Readiness probe; 503 when the credential store is unreachable
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<ProbeResponse>, (StatusCode, Json<ProbeResponse>)> {
    let store = match db::health_check(&state.db).await {
        Ok(()) => StoreCheck {
            status: "healthy",
            message: None,
        },
        Err(e) => StoreCheck {
            status: "unhealthy",
            message: Some(e.to_string()),
        },
    };

    let ready = store.status == "healthy";
    let response = ProbeResponse {
        status: if ready { "ready" } else { "not_ready" },
        version: env!("CARGO_PKG_VERSION"),
        store: Some(store),
    };

    if ready {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

/// Liveness probe
pub async fn liveness_check() -> Json<ProbeResponse> {
    Json(ProbeResponse {
        status: "alive",
        version: env!("CARGO_PKG_VERSION"),
        store: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_returns_healthy() {
        let response = health_check().await;
        assert_eq!(response.0.status, "healthy");
        assert!(!response.0.version.is_empty());
    }

    #[tokio::test]
    async fn test_liveness_check_returns_alive() {
        let response = liveness_check().await;
        assert_eq!(response.0.status, "alive");
    }
}
