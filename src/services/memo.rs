//! Scored-result memo.
//!
//! Keyed by (forecast content identity, profile name, profile version
//! stamp). The version stamp does the invalidation work: every profile
//! re-ingest writes a new stamp, so stale results simply stop matching and
//! age out under LRU eviction; nothing is deleted eagerly.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::services::scoring::ScoredRow;

/// Fallback capacity when config specifies zero entries.
const DEFAULT_MEMO_CAPACITY: usize = 128;

/// Stamp used in keys for a profile that has never been ingested.
const NEVER_INGESTED: &str = "never";

/// Stable identity of a forecast payload within this process.
fn forecast_identity(forecast: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    forecast.to_string().hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct MemoKey {
    forecast_id: u64,
    profile: String,
    version: String,
}

impl MemoKey {
    pub fn new(forecast: &Value, profile: &str, version: Option<&str>) -> Self {
        Self {
            forecast_id: forecast_identity(forecast),
            profile: profile.to_string(),
            version: version.unwrap_or(NEVER_INGESTED).to_string(),
        }
    }
}

/// Capacity-bounded LRU memo of scoring output.
///
/// Rows are shared behind `Arc`: hits hand out the cached computation
/// without cloning row data.
pub struct ScoringMemo {
    entries: RwLock<LruCache<MemoKey, Arc<Vec<ScoredRow>>>>,
}

impl ScoringMemo {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_MEMO_CAPACITY))
            .expect("default memo capacity is non-zero");

        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    pub async fn get(&self, key: &MemoKey) -> Option<Arc<Vec<ScoredRow>>> {
        self.entries.write().await.get(key).cloned()
    }

    pub async fn put(&self, key: MemoKey, rows: Vec<ScoredRow>) -> Arc<Vec<ScoredRow>> {
        let rows = Arc::new(rows);
        self.entries.write().await.put(key, rows.clone());
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(score: &str) -> ScoredRow {
        let mut row = ScoredRow::new();
        row.insert("score".to_string(), json!(score));
        row
    }

    #[tokio::test]
    async fn test_hit_on_identical_triple() {
        let memo = ScoringMemo::new(8);
        let forecast = json!({"forecastHourly": {"hours": [{"temp": 25}]}});

        let key = MemoKey::new(&forecast, "default", Some("1700000000"));
        memo.put(key.clone(), vec![row("5.00")]).await;

        let hit = memo.get(&key).await.unwrap();
        assert_eq!(hit[0]["score"], json!("5.00"));
    }

    #[tokio::test]
    async fn test_new_version_stamp_misses() {
        let memo = ScoringMemo::new(8);
        let forecast = json!({"forecastHourly": {"hours": [{"temp": 25}]}});

        let old = MemoKey::new(&forecast, "default", Some("1700000000"));
        memo.put(old, vec![row("5.00")]).await;

        // Re-ingestion wrote a new stamp: same forecast, same profile,
        // different key.
        let new = MemoKey::new(&forecast, "default", Some("1700000099"));
        assert!(memo.get(&new).await.is_none());
    }

    #[tokio::test]
    async fn test_forecast_content_changes_key() {
        let memo = ScoringMemo::new(8);

        let a = json!({"forecastHourly": {"hours": [{"temp": 25}]}});
        let b = json!({"forecastHourly": {"hours": [{"temp": 26}]}});

        memo.put(MemoKey::new(&a, "default", Some("1")), vec![row("5.00")])
            .await;
        assert!(memo.get(&MemoKey::new(&b, "default", Some("1"))).await.is_none());
    }

    #[tokio::test]
    async fn test_never_ingested_sentinel_keys_consistently() {
        let forecast = json!({"forecastHourly": {"hours": []}});
        let a = MemoKey::new(&forecast, "default", None);
        let b = MemoKey::new(&forecast, "default", None);
        assert_eq!(a, b);
        assert_ne!(a, MemoKey::new(&forecast, "default", Some("1")));
    }

    #[tokio::test]
    async fn test_capacity_eviction_by_recency() {
        let memo = ScoringMemo::new(1);
        let forecast = json!({"forecastHourly": {"hours": []}});

        let first = MemoKey::new(&forecast, "a", Some("1"));
        let second = MemoKey::new(&forecast, "b", Some("1"));

        memo.put(first.clone(), vec![row("1.00")]).await;
        memo.put(second, vec![row("2.00")]).await;

        assert!(memo.get(&first).await.is_none());
    }
}
