/// Reference ellipsoid.
///
/// Web mercator treats the Earth as a sphere, so only the semimajor axis is used for projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Datum {
    semimajor: f64,
    inv_flattening: f64,
}

impl Datum {
    /// WGS84 ellipsoid.
    pub const WGS84: Self = Datum {
        semimajor: 6_378_137.0,
        inv_flattening: 298.257223563,
    };

    /// Semimajor axis in meters.
    pub fn semimajor(&self) -> f64 {
        self.semimajor
    }

    /// Inverse flattening.
    pub fn inv_flattening(&self) -> f64 {
        self.inv_flattening
    }

    /// Length of the equator in meters.
    pub fn equator_length(&self) -> f64 {
        2.0 * std::f64::consts::PI * self.semimajor
    }
}

impl Default for Datum {
    fn default() -> Self {
        Self::WGS84
    }
}
