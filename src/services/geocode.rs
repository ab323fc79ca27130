//! Reverse geocoding behind a bounded memo.
//!
//! Geocoding results are treated as static (a rounded coordinate maps to
//! the same city/country forever), so entries never expire by time; a fixed
//! LRU capacity is the only bound on growth. The geocoder itself sits
//! behind a trait so the cache contract (at most one underlying lookup per
//! distinct rounded pair) is testable.

use std::num::NonZeroUsize;

use lru::LruCache;
use reverse_geocoder::ReverseGeocoder;
use tokio::sync::RwLock;

use crate::helpers::RoundedCoord;

/// Fallback capacity when config specifies zero entries.
const DEFAULT_CACHE_CAPACITY: usize = 128;

/// Where a coordinate lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub city: String,
    pub country: String,
}

/// Black-box coordinate -> place lookup. Pure computation, never blocking.
pub trait Geocoder: Send + Sync {
    fn lookup(&self, lat: f64, lon: f64) -> Place;
}

/// Production geocoder backed by the offline city dataset.
pub struct OfflineGeocoder {
    inner: ReverseGeocoder,
}

impl OfflineGeocoder {
    pub fn new() -> Self {
        Self {
            inner: ReverseGeocoder::new(),
        }
    }
}

impl Geocoder for OfflineGeocoder {
    fn lookup(&self, lat: f64, lon: f64) -> Place {
        let result = self.inner.search((lat, lon));
        Place {
            city: result.record.name.clone(),
            country: result.record.cc.clone(),
        }
    }
}

/// LRU memo over a `Geocoder`, keyed by the rounded coordinate pair.
pub struct GeocodeCache {
    geocoder: Box<dyn Geocoder>,
    entries: RwLock<LruCache<RoundedCoord, Place>>,
}

impl GeocodeCache {
    pub fn new(geocoder: Box<dyn Geocoder>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_CACHE_CAPACITY))
            .expect("default cache capacity is non-zero");

        Self {
            geocoder,
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Cached place for a rounded coordinate.
    ///
    /// Two concurrent misses for the same pair may both invoke the
    /// geocoder; the lookup is pure and deterministic, so they insert the
    /// same value.
    pub async fn lookup(&self, coord: &RoundedCoord) -> Place {
        // LruCache::get is mutable (updates recency), so take the write lock.
        if let Some(place) = self.entries.write().await.get(coord) {
            return place.clone();
        }

        let place = self.geocoder.lookup(coord.lat_f64(), coord.lon_f64());
        tracing::debug!(
            "revgeo'd ({}, {}) to {}, {}",
            coord.lat,
            coord.lon,
            place.city,
            place.country
        );

        self.entries
            .write()
            .await
            .put(coord.clone(), place.clone());
        place
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingGeocoder {
        calls: Arc<AtomicUsize>,
    }

    impl Geocoder for CountingGeocoder {
        fn lookup(&self, lat: f64, _lon: f64) -> Place {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Place {
                city: format!("city-{}", lat),
                country: "CH".to_string(),
            }
        }
    }

    fn counting_cache(capacity: usize) -> (GeocodeCache, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = GeocodeCache::new(
            Box::new(CountingGeocoder {
                calls: calls.clone(),
            }),
            capacity,
        );
        (cache, calls)
    }

    #[tokio::test]
    async fn test_same_rounded_pair_hits_once() {
        let (cache, calls) = counting_cache(8);

        // Different raw coordinates, same rounded pair.
        let a = RoundedCoord::new(47.3761, 8.5417, 2);
        let b = RoundedCoord::new(47.3799, 8.5438, 2);

        let first = cache.lookup(&a).await;
        let second = cache.lookup(&b).await;

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_pairs_each_invoke_geocoder() {
        let (cache, calls) = counting_cache(8);

        cache.lookup(&RoundedCoord::new(47.38, 8.54, 2)).await;
        cache.lookup(&RoundedCoord::new(48.21, 16.37, 2)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_capacity_bound_evicts_by_recency() {
        let (cache, calls) = counting_cache(1);

        let zurich = RoundedCoord::new(47.38, 8.54, 2);
        let vienna = RoundedCoord::new(48.21, 16.37, 2);

        cache.lookup(&zurich).await;
        cache.lookup(&vienna).await; // evicts zurich
        cache.lookup(&zurich).await; // recomputed

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
