//! Great-circle distances and nearest point-of-interest search.

mod distance;
mod nearest;

pub use distance::{EARTH_RADIUS_KM, haversine_km};
pub use nearest::{Nearest, NearestTable, filter_operational, find_nearest_locations, nearest_to};

use serde::{Deserialize, Serialize};

/// Anything with a position in decimal degrees.
pub trait Coordinates {
    fn latitude(&self) -> f64;
    fn longitude(&self) -> f64;
}

/// A named point of interest (transit station, mall).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(name: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.to_string(),
            latitude,
            longitude,
        }
    }
}

impl Coordinates for Location {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// True when both values are finite and within the WGS84 degree ranges.
pub fn is_valid_position(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}
