//! Coordinate rounding helpers.
//!
//! Raw request coordinates are rounded to a configured number of decimal
//! places before they touch any cache. Rounding is lossy on purpose: it
//! bounds cache-key cardinality, and every request that rounds to the same
//! pair must hit the same geocode, forecast, and scoring entries.
//!
//! The rounded values are kept as *strings* (the `format!` output), because
//! the string form is the canonical cache-key component; re-parsing to f64
//! and re-formatting must never produce a different key.

/// A coordinate pair rounded to the configured precision.
///
/// `lat`/`lon` are the exact `{:.N}`-formatted strings used in cache keys.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct RoundedCoord {
    pub lat: String,
    pub lon: String,
}

impl RoundedCoord {
    /// Round a raw coordinate pair to `decimals` decimal places.
    pub fn new(lat: f64, lon: f64, decimals: usize) -> Self {
        Self {
            lat: format!("{:.*}", decimals, lat),
            lon: format!("{:.*}", decimals, lon),
        }
    }

    /// Parse the rounded latitude back to f64 (for the geocoder).
    pub fn lat_f64(&self) -> f64 {
        self.lat.parse().unwrap_or(0.0)
    }

    /// Parse the rounded longitude back to f64 (for the geocoder).
    pub fn lon_f64(&self) -> f64 {
        self.lon.parse().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding_two_decimals() {
        let c = RoundedCoord::new(47.37689, 8.54169, 2);
        assert_eq!(c.lat, "47.38");
        assert_eq!(c.lon, "8.54");
    }

    #[test]
    fn test_rounding_pads_zeroes() {
        // Exactly representable short values still get the full width,
        // so "47.5" and "47.50" cannot produce distinct cache keys.
        let c = RoundedCoord::new(47.5, 8.0, 2);
        assert_eq!(c.lat, "47.50");
        assert_eq!(c.lon, "8.00");
    }

    #[test]
    fn test_nearby_coords_collapse_to_same_key() {
        let a = RoundedCoord::new(47.3761, 8.5417, 2);
        let b = RoundedCoord::new(47.3799, 8.5438, 2);
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_coords_stay_distinct() {
        let a = RoundedCoord::new(47.37, 8.54, 2);
        let b = RoundedCoord::new(47.38, 8.54, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_negative_coords() {
        let c = RoundedCoord::new(-33.8688, -151.2093, 1);
        assert_eq!(c.lat, "-33.9");
        assert_eq!(c.lon, "-151.2");
    }

    #[test]
    fn test_roundtrip_to_f64() {
        let c = RoundedCoord::new(47.3769, 8.5417, 2);
        assert!((c.lat_f64() - 47.38).abs() < 1e-9);
        assert!((c.lon_f64() - 8.54).abs() < 1e-9);
    }
}
