//! The forecast endpoint: the full scoring pipeline for one request.
//!
//! GET /forecast?lang&tz&lat&lon&profile
//!
//! Pipeline: round coordinates → geocode (cached) → forecast (cached,
//! resilient fetch) → current profile version → memoized scoring →
//! assemble response. Strictly sequential; any failing step aborts the
//! request with its originating error, never a partial response.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::helpers::RoundedCoord;
use crate::services::geocode::GeocodeCache;
use crate::services::memo::{MemoKey, ScoringMemo};
use crate::services::scoring::{self, ScoredRow};
use crate::services::upstream::UpstreamFetcher;
use crate::services::{forecast_cache, profiles};
use crate::store::KvStore;

/// Shared application state: the store handle, upstream client, and the
/// in-process memos. Constructed once at startup, torn down at shutdown.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) kv: Arc<KvStore>,
    pub(crate) fetcher: Arc<UpstreamFetcher>,
    pub(crate) geocache: Arc<GeocodeCache>,
    pub(crate) memo: Arc<ScoringMemo>,
    pub(crate) config: Arc<AppConfig>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ForecastQuery {
    /// Forecast language code (e.g. "en")
    pub lang: String,
    /// IANA timezone of the requested location (e.g. "Europe/Zurich")
    pub tz: String,
    /// Raw latitude; rounded to the configured precision before use
    pub lat: f64,
    /// Raw longitude; rounded to the configured precision before use
    pub lon: f64,
    /// Scoring profile name (defaults to "default")
    pub profile: Option<String>,
}

/// Where the rounded coordinate landed.
#[derive(Debug, Serialize, ToSchema)]
pub struct ForecastMeta {
    /// Country code of the resolved location
    pub country: String,
    /// Nearest city
    pub local: String,
}

/// Scored forecast response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ForecastResponse {
    pub meta: ForecastMeta,
    /// When the underlying forecast was fetched upstream (may predate this
    /// request by up to an hour when served from cache)
    #[serde(rename = "forecastFetchTime")]
    pub forecast_fetch_time: String,
    /// One scored row per forecast hour: `time`, one annotated
    /// "contribution (raw)" field per rule, and the accumulated `score`
    #[schema(value_type = Vec<Object>)]
    pub forecast: Vec<ScoredRow>,
}

/// Run the scoring pipeline for one location and profile.
#[utoipa::path(
    get,
    path = "/forecast",
    tag = "Forecast",
    params(ForecastQuery),
    responses(
        (status = 200, description = "Scored hourly forecast", body = ForecastResponse),
        (status = 400, description = "Missing or malformed query parameters", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown scoring profile", body = crate::errors::ErrorResponse),
        (status = 422, description = "Profile does not match the forecast data", body = crate::errors::ErrorResponse),
        (status = 503, description = "Upstream provider or store unreachable", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_forecast(
    State(state): State<AppState>,
    Query(params): Query<ForecastQuery>,
) -> Result<Json<ForecastResponse>, AppError> {
    let profile = params.profile.unwrap_or_else(|| "default".to_string());

    tracing::debug!("coords requested ({}, {})", params.lat, params.lon);
    let coord = RoundedCoord::new(params.lat, params.lon, state.config.coord_decimals);
    tracing::debug!("coords rounded to ({}, {})", coord.lat, coord.lon);

    let place = state.geocache.lookup(&coord).await;

    let bundle = if state.config.forecast_cache_enabled {
        forecast_cache::get_or_fetch(
            &state.kv,
            &state.fetcher,
            &coord,
            &params.lang,
            &place.country,
            &params.tz,
        )
        .await?
    } else {
        state
            .fetcher
            .fetch(&coord, &params.lang, &place.country, &params.tz)
            .await?
    };

    let version = profiles::current_version(&state.kv, &profile).await?;
    let key = MemoKey::new(&bundle.forecast, &profile, version.as_deref());

    let rows = match state.memo.get(&key).await {
        Some(rows) => rows,
        None => {
            tracing::debug!("scoring memo miss for profile `{}`", profile);
            let rules = profiles::get_profile(&state.kv, &profile).await?;
            let computed = scoring::score(&bundle.forecast, &rules)?;
            state.memo.put(key, computed).await
        }
    };

    Ok(Json(ForecastResponse {
        meta: ForecastMeta {
            country: place.country,
            local: place.city,
        },
        forecast_fetch_time: bundle.fetched_at,
        forecast: rows.as_ref().clone(),
    }))
}
