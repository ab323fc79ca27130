// Scorecast API v0.1
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod errors;
mod helpers;
mod routes;
mod services;
mod store;

use config::AppConfig;
use routes::forecast::AppState;
use services::credentials::CredentialSupplier;
use services::geocode::{GeocodeCache, OfflineGeocoder};
use services::memo::ScoringMemo;
use services::upstream::UpstreamFetcher;
use store::KvStore;

/// Scorecast API OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Scorecast API",
        version = "0.1.0",
        description = "Forecast-scoring proxy. Fetches hourly weather forecasts from the \
            upstream provider, applies a user-configurable scoring profile to every \
            forecast hour, and serves the scored result, with a persistent \
            hour-aligned forecast cache, in-process memos, and version-stamped \
            profile invalidation to keep upstream calls and recomputation minimal.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Forecast", description = "Scored forecast retrieval"),
        (name = "Profiles", description = "Scoring profile management"),
        (name = "Cache", description = "Persistent cache diagnostics"),
    ),
    paths(
        routes::health::health_check,
        routes::forecast::get_forecast,
        routes::profiles::list_profiles,
        routes::profiles::ingest_profile,
        routes::cache::wipe_cache,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::forecast::ForecastMeta,
            routes::forecast::ForecastResponse,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scorecast_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(AppConfig::from_env());

    // Persistent store handle; the client itself is lazy, so probe once to
    // surface misconfiguration early.
    let kv = Arc::new(
        KvStore::new(
            &config.redis_url,
            Duration::from_secs(config.store_reconnect_secs),
        )
        .expect("Failed to configure store client"),
    );
    if kv.is_alive().await {
        tracing::info!("Persistent store reachable");
    } else {
        tracing::warn!("Persistent store not reachable at startup, continuing anyway");
    }

    // Signing key material is validated here, malformed keys abort startup.
    let credentials = Arc::new(
        CredentialSupplier::from_config(&config).expect("Failed to load signing credentials"),
    );

    let fetcher = Arc::new(UpstreamFetcher::new(credentials, &config));
    let geocache = Arc::new(GeocodeCache::new(
        Box::new(OfflineGeocoder::new()),
        config.memo_capacity,
    ));
    let memo = Arc::new(ScoringMemo::new(config.memo_capacity));

    // Seed the default profile so a fresh deployment can score immediately.
    match tokio::fs::read(&config.scoring_seed_path).await {
        Ok(body) => match services::profiles::put_profile(&kv, "default", &body).await {
            Ok(()) => tracing::info!(
                "Seeded profile `default` from {}",
                config.scoring_seed_path
            ),
            Err(e) => tracing::error!("Failed to seed profile `default`: {}", e),
        },
        Err(e) => tracing::warn!(
            "No scoring seed at {} ({}), skipping",
            config.scoring_seed_path,
            e
        ),
    }

    // Build shared application state
    let state = AppState {
        kv,
        fetcher,
        geocache,
        memo,
        config: config.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Static entry page and assets
    let index = ServeFile::new(format!("{}/index.html", config.web_dir));
    let assets = ServeDir::new(format!("{}/assets", config.web_dir));

    // Build router
    let app = Router::new()
        .route("/forecast", get(routes::forecast::get_forecast))
        .route("/profiles", get(routes::profiles::list_profiles))
        .route(
            "/ingest/scoring/:profile",
            put(routes::profiles::ingest_profile),
        )
        .route("/cache/wipe", post(routes::cache::wipe_cache))
        .route("/health", get(routes::health::health_check))
        .with_state(state)
        .route_service("/", index)
        .nest_service("/assets", assets)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
