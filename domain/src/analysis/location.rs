//! Geographic location value object

use serde::{Deserialize, Serialize};

/// Latitude/longitude pair in decimal degrees (Value Object)
///
/// Always wrapped in `Option` where it appears: `None` means unknown.
/// `(0.0, 0.0)` is a real coordinate in the Gulf of Guinea, not a
/// placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    /// Create a location, returning None when either coordinate is out of
    /// range or not finite.
    pub fn try_new(lat: f64, lng: f64) -> Option<Self> {
        if Self::valid_lat(lat) && Self::valid_lng(lng) {
            Some(Self { lat, lng })
        } else {
            None
        }
    }

    pub fn valid_lat(lat: f64) -> bool {
        lat.is_finite() && (-90.0..=90.0).contains(&lat)
    }

    pub fn valid_lng(lng: f64) -> bool {
        lng.is_finite() && (-180.0..=180.0).contains(&lng)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges() {
        assert!(Location::try_new(90.0, 180.0).is_some());
        assert!(Location::try_new(-90.0, -180.0).is_some());
        assert!(Location::try_new(90.1, 0.0).is_none());
        assert!(Location::try_new(0.0, -180.5).is_none());
        assert!(Location::try_new(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn test_zero_is_a_real_coordinate() {
        assert_eq!(Location::try_new(0.0, 0.0), Some(Location { lat: 0.0, lng: 0.0 }));
    }
}
