use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::routes::forecast::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status ("ok" when healthy, "degraded" when the store is unreachable)
    pub status: String,
    /// API version
    pub version: String,
    /// Whether the persistent store answers a liveness probe
    pub store: bool,
}

/// Health check endpoint.
///
/// Probes the persistent store. Returns status "degraded" (still 200) when
/// the store is unreachable, so load balancers can distinguish partial
/// failures.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_ok = state.kv.is_alive().await;

    Json(HealthResponse {
        status: if store_ok {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: store_ok,
    })
}

#[cfg(test)]
mod tests {
    // The health check needs the shared AppState (a live store handle), so
    // it is exercised via integration/manual testing with a running redis.
}
