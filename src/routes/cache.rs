//! Cache wipe endpoint.
//!
//! POST /cache/wipe?pattern deletes all persistent-store keys matching a
//! glob pattern, defaulting to the forecast cache namespace. A diagnostics
//! affordance, deliberately unauthenticated.

use axum::extract::{Query, State};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::errors::AppError;
use crate::routes::forecast::AppState;
use crate::store::DEFAULT_WIPE_PATTERN;

#[derive(Debug, Deserialize, IntoParams)]
pub struct WipeQuery {
    /// Glob pattern of keys to delete (defaults to "cache:*")
    pub pattern: Option<String>,
}

/// Delete all store keys matching a glob pattern.
#[utoipa::path(
    post,
    path = "/cache/wipe",
    tag = "Cache",
    params(WipeQuery),
    responses(
        (status = 200, description = "Matching keys deleted", body = String),
        (status = 503, description = "Store unreachable", body = crate::errors::ErrorResponse),
    )
)]
pub async fn wipe_cache(
    State(state): State<AppState>,
    Query(params): Query<WipeQuery>,
) -> Result<&'static str, AppError> {
    let pattern = params
        .pattern
        .unwrap_or_else(|| DEFAULT_WIPE_PATTERN.to_string());
    tracing::debug!("wiping pattern `{}` from store", pattern);

    let removed = state.kv.delete_matching(&pattern).await?;
    tracing::debug!("wiped {} keys", removed);

    Ok("OK")
}
