//! Scoring profile storage.
//!
//! Profiles live in the persistent store under `scoring:<name>`, replaced
//! wholesale on ingest. Each ingest also writes the current wall-clock
//! timestamp under `ingest:scoring:<name>`; that stamp is the version the
//! scoring memo keys on, so dependent cached results go stale without any
//! explicit deletion. Only equality of stamps matters, never ordering.

use chrono::Utc;

use crate::errors::AppError;
use crate::services::scoring::ScoringRule;
use crate::store::{self, KvStore, SCORING_KEY_PREFIX};

/// Parse and validate a rule array body.
pub fn parse_rules(body: &[u8]) -> Result<Vec<ScoringRule>, AppError> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("invalid scoring rule array: {}", e)))
}

/// Validate and persist a profile, then stamp its new version.
pub async fn put_profile(kv: &KvStore, name: &str, body: &[u8]) -> Result<(), AppError> {
    let rules = parse_rules(body)?;
    tracing::debug!("storing scoring profile `{}` ({} rules)", name, rules.len());

    // The body is stored verbatim; the parse above only gates ingestion.
    kv.set(&store::scoring_key(name), body).await?;

    let stamp = Utc::now().timestamp_millis().to_string();
    kv.set(&store::scoring_version_key(name), stamp.as_bytes())
        .await?;
    tracing::debug!("profile `{}` stamped at {}", name, stamp);

    Ok(())
}

/// Load a profile's rule sequence.
pub async fn get_profile(kv: &KvStore, name: &str) -> Result<Vec<ScoringRule>, AppError> {
    let raw = kv
        .get(&store::scoring_key(name))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("profile `{}` not found", name)))?;

    // Bodies are validated at ingest; an unreadable one means the store
    // data was tampered with out of band.
    serde_json::from_slice(&raw)
        .map_err(|e| AppError::StoreUnavailable(format!("profile `{}` is unreadable: {}", name, e)))
}

/// Version stamp written at the last ingest, or `None` if the profile has
/// never been ingested.
pub async fn current_version(kv: &KvStore, name: &str) -> Result<Option<String>, AppError> {
    Ok(kv
        .get(&store::scoring_version_key(name))
        .await?
        .map(|raw| String::from_utf8_lossy(&raw).into_owned()))
}

/// Names of all known profiles, sorted.
pub async fn list_profiles(kv: &KvStore) -> Result<Vec<String>, AppError> {
    let pattern = format!("{}*", SCORING_KEY_PREFIX);
    let mut names: Vec<String> = kv
        .scan_keys(&pattern)
        .await?
        .into_iter()
        .filter_map(|key| {
            key.strip_prefix(SCORING_KEY_PREFIX)
                .map(std::string::ToString::to_string)
        })
        .collect();
    names.sort();
    Ok(names)
}
