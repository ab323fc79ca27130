/// Application configuration, parsed from environment variables.
///
/// Statically shaped: every knob is a named, typed field, validated at
/// startup. Missing or ill-typed required values abort the process before
/// the server binds.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Persistent key-value store connection URL.
    pub redis_url: String,
    pub port: u16,
    /// WeatherKit signing key id (JWT `kid` header).
    pub weatherkit_key_id: String,
    /// WeatherKit team id (JWT `iss` claim).
    pub weatherkit_team_id: String,
    /// WeatherKit service id (JWT `sub` claim).
    pub weatherkit_service_id: String,
    /// Base64-encoded PEM of the ES256 private key.
    pub weatherkit_private_key: String,
    /// Retry budget on top of the initial attempt.
    pub retry_attempts: u32,
    /// HTTP statuses (plus the synthetic timeout status) worth retrying.
    pub retry_codes: Vec<u16>,
    /// Linear backoff unit: delay before attempt n is n x this.
    pub retry_backoff_ms: u64,
    /// Per-attempt timeout for upstream calls.
    pub upstream_timeout_secs: u64,
    /// Decimal places kept when rounding coordinates for cache keys.
    pub coord_decimals: usize,
    /// Capacity of the in-process memos (geocode cache, scoring memo).
    pub memo_capacity: usize,
    pub token_ttl_mins: i64,
    /// When false, every request bypasses the persistent forecast cache.
    pub forecast_cache_enabled: bool,
    /// Freshness window for the store connection liveness probe.
    pub store_reconnect_secs: u64,
    /// Rule file ingested as profile `default` at startup, if present.
    pub scoring_seed_path: String,
    /// Directory containing the static entry page and assets.
    pub web_dir: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL").expect("REDIS_URL must be set"),
            port: env_parsed("PORT", 8000),
            weatherkit_key_id: std::env::var("WEATHERKIT_KEY_ID")
                .expect("WEATHERKIT_KEY_ID must be set"),
            weatherkit_team_id: std::env::var("WEATHERKIT_TEAM_ID")
                .expect("WEATHERKIT_TEAM_ID must be set"),
            weatherkit_service_id: std::env::var("WEATHERKIT_SERVICE_ID")
                .expect("WEATHERKIT_SERVICE_ID must be set"),
            weatherkit_private_key: std::env::var("WEATHERKIT_PRIVATE_KEY")
                .expect("WEATHERKIT_PRIVATE_KEY must be set"),
            retry_attempts: env_parsed("RETRY_ATTEMPTS", 2),
            retry_codes: parse_status_list(
                &std::env::var("RETRY_STATUS_CODES")
                    .unwrap_or_else(|_| "500,502,503,504,1000".to_string()),
            )
            .expect("RETRY_STATUS_CODES must be a comma-separated list of status codes"),
            retry_backoff_ms: env_parsed("RETRY_BACKOFF_MS", 500),
            upstream_timeout_secs: env_parsed("UPSTREAM_TIMEOUT_SECS", 10),
            coord_decimals: env_parsed("COORD_DECIMALS", 2),
            memo_capacity: env_parsed("MEMO_CAPACITY", 128),
            token_ttl_mins: env_parsed("TOKEN_TTL_MINS", 30),
            forecast_cache_enabled: env_parsed("FORECAST_CACHE_ENABLED", true),
            store_reconnect_secs: env_parsed("STORE_RECONNECT_SECS", 30),
            scoring_seed_path: std::env::var("SCORING_SEED_PATH")
                .unwrap_or_else(|_| "./data/default-profile.json".to_string()),
            web_dir: std::env::var("WEB_DIR").unwrap_or_else(|_| "./web".to_string()),
        }
    }
}

/// Read an optional env var and parse it, panicking on malformed values
/// (fail fast beats limping along with a half-applied configuration).
fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{} is malformed: {}", name, e)),
        Err(_) => default,
    }
}

/// Parse a comma-separated status allow-list, e.g. "500,502,1000".
fn parse_status_list(raw: &str) -> Result<Vec<u16>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u16>().map_err(|e| format!("`{}`: {}", s, e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_list() {
        assert_eq!(
            parse_status_list("500,502,503,504,1000").unwrap(),
            vec![500, 502, 503, 504, 1000]
        );
    }

    #[test]
    fn test_parse_status_list_tolerates_spaces() {
        assert_eq!(parse_status_list("500, 502 ,503").unwrap(), vec![500, 502, 503]);
    }

    #[test]
    fn test_parse_status_list_rejects_garbage() {
        assert!(parse_status_list("500,oops").is_err());
    }

    #[test]
    fn test_parse_status_list_empty() {
        assert!(parse_status_list("").unwrap().is_empty());
    }
}
