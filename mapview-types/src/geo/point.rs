use approx::AbsDiffEq;
use serde::{Deserialize, Serialize};

use crate::error::MapViewTypesError;

/// A point on the surface of the Earth.
pub trait GeoPoint {
    /// Latitude in degrees.
    fn lat(&self) -> f64;
    /// Longitude in degrees.
    fn lon(&self) -> f64;

    /// Latitude in radians.
    fn lat_rad(&self) -> f64 {
        self.lat().to_radians()
    }

    /// Longitude in radians.
    fn lon_rad(&self) -> f64 {
        self.lon().to_radians()
    }
}

/// 2d point on the surface of the Earth, in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct GeoPoint2d {
    lat: f64,
    lon: f64,
}

impl GeoPoint for GeoPoint2d {
    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }
}

impl GeoPoint2d {
    /// Creates a point from latitude and longitude in degrees.
    pub const fn latlon(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Creates a point from a `[lat, lon, ...]` slice, as used by declarative coordinate lists.
    /// Extra values (altitude etc.) are ignored.
    pub fn from_slice(values: &[f64]) -> Result<Self, MapViewTypesError> {
        let [lat, lon, ..] = values else {
            return Err(MapViewTypesError::IncompletePair(values.len()));
        };

        for v in [lat, lon] {
            if !v.is_finite() {
                return Err(MapViewTypesError::NonFinite(*v));
            }
        }

        Ok(Self::latlon(*lat, *lon))
    }
}

impl AbsDiffEq for GeoPoint2d {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.lat.abs_diff_eq(&other.lat, epsilon) && self.lon.abs_diff_eq(&other.lon, epsilon)
    }
}

/// Creates a new GeoPoint2d from latitude and longitude values (in degrees).
///
/// ```
/// use mapview_types::geo::GeoPoint;
/// use mapview_types::latlon;
///
/// let point = latlon!(47.32, 12.79);
/// assert_eq!(point.lat(), 47.32);
/// ```
#[macro_export]
macro_rules! latlon {
    ($lat:expr, $lon:expr) => {
        $crate::geo::GeoPoint2d::latlon($lat, $lon)
    };
}
