//! Profile endpoints.
//!
//! - GET /profiles: list known profile names
//! - PUT /ingest/scoring/:profile: replace a profile wholesale

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;

use crate::errors::AppError;
use crate::routes::forecast::AppState;
use crate::services::profiles;

/// List the names of all known scoring profiles.
#[utoipa::path(
    get,
    path = "/profiles",
    tag = "Profiles",
    responses(
        (status = 200, description = "Known profile names", body = Vec<String>),
        (status = 503, description = "Store unreachable", body = crate::errors::ErrorResponse),
    )
)]
pub async fn list_profiles(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let names = profiles::list_profiles(&state.kv).await?;
    Ok(Json(names))
}

/// Replace a scoring profile. The body is a JSON rule array; it is
/// validated before anything is written, and a successful write stamps a
/// new profile version (invalidating memoized scores without any flush).
#[utoipa::path(
    put,
    path = "/ingest/scoring/{profile}",
    tag = "Profiles",
    params(("profile" = String, Path, description = "Profile name")),
    request_body(content = String, description = "JSON array of scoring rules"),
    responses(
        (status = 200, description = "Profile stored", body = String),
        (status = 400, description = "Body is not a valid rule array", body = crate::errors::ErrorResponse),
        (status = 503, description = "Store unreachable", body = crate::errors::ErrorResponse),
    )
)]
pub async fn ingest_profile(
    State(state): State<AppState>,
    Path(profile): Path<String>,
    body: Bytes,
) -> Result<&'static str, AppError> {
    profiles::put_profile(&state.kv, &profile, &body).await?;
    Ok("OK")
}
