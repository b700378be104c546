//! Local planar offsets to approximate latitude and longitude.
//!
//! The conversion is a flat-earth linearization around a fixed origin: one scale factor per axis,
//! no ellipsoid. It is only meaningful within a few kilometers of the origin and is not meant to
//! be inverted.

use serde::{Deserialize, Serialize};
use uom::si::{
    f64::{Length, Ratio},
    length::meter,
    ratio::ratio,
};

/// Meters spanned by one degree of latitude.
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Meters spanned by one degree of longitude near the default origin.
pub const METERS_PER_DEGREE_LON: f64 = 85_390.0;

/// A latitude and longitude in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    fn nan() -> Self {
        Self::new(f64::NAN, f64::NAN)
    }

    pub fn is_nan(&self) -> bool {
        self.latitude.is_nan() || self.longitude.is_nan()
    }
}

/// The origin of the local frame and the scale factors used to leave it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoReference {
    pub origin: GeoPoint,

    /// Distance covered by one degree of latitude, in meters.
    pub meters_per_degree_lat: f64,

    /// Distance covered by one degree of longitude at the origin's latitude, in meters.
    pub meters_per_degree_lon: f64,
}

impl Default for GeoReference {
    fn default() -> Self {
        Self::at(GeoPoint::new(47.641468, -122.140165))
    }
}

impl GeoReference {
    /// A reference at `origin` using the default scale factors.
    pub fn at(origin: GeoPoint) -> Self {
        Self {
            origin,
            meters_per_degree_lat: METERS_PER_DEGREE_LAT,
            meters_per_degree_lon: METERS_PER_DEGREE_LON,
        }
    }

    /// Convert an offset from the origin into a geodetic point.
    ///
    /// `east` runs along the local X axis and `north` along the local Y axis. If either offset is
    /// NaN both coordinates of the result are NaN; invalid samples are passed through instead of
    /// aborting a run.
    pub fn to_geodetic(&self, east: Length, north: Length) -> GeoPoint {
        if east.is_nan() || north.is_nan() {
            return GeoPoint::nan();
        }

        let lat_scale = Length::new::<meter>(self.meters_per_degree_lat);
        let lon_scale = Length::new::<meter>(self.meters_per_degree_lon);
        let d_lat: Ratio = north / lat_scale;
        let d_lon: Ratio = east / lon_scale;

        GeoPoint::new(
            self.origin.latitude + d_lat.get::<ratio>(),
            self.origin.longitude + d_lon.get::<ratio>(),
        )
    }
}

/// Convert an offset in meters into `(latitude, longitude)` degrees around an origin.
///
/// Uses the default scale factors of [`GeoReference`].
pub fn meters_to_gps(x: f64, y: f64, origin_lat: f64, origin_lon: f64) -> (f64, f64) {
    let point = GeoReference::at(GeoPoint::new(origin_lat, origin_lon))
        .to_geodetic(Length::new::<meter>(x), Length::new::<meter>(y));
    (point.latitude, point.longitude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use quickcheck::quickcheck;
    use rstest::rstest;

    const LAT0: f64 = 47.641468;
    const LON0: f64 = -122.140165;

    #[test]
    fn zero_offset_is_origin() {
        assert_eq!(meters_to_gps(0.0, 0.0, LAT0, LON0), (LAT0, LON0));
    }

    #[test]
    fn one_degree_of_offset() {
        let (lat, lon) = meters_to_gps(METERS_PER_DEGREE_LON, METERS_PER_DEGREE_LAT, 0.0, 0.0);
        assert_relative_eq!(lat, 1.0);
        assert_relative_eq!(lon, 1.0);
    }

    #[rstest]
    #[case(f64::NAN, 0.0)]
    #[case(0.0, f64::NAN)]
    #[case(f64::NAN, f64::NAN)]
    fn nan_offsets_propagate(#[case] x: f64, #[case] y: f64) {
        let (lat, lon) = meters_to_gps(x, y, LAT0, LON0);
        assert!(lat.is_nan());
        assert!(lon.is_nan());
    }

    #[test]
    fn custom_scale_factors_apply() {
        let reference = GeoReference {
            origin: GeoPoint::new(10.0, 20.0),
            meters_per_degree_lat: 100.0,
            meters_per_degree_lon: 50.0,
        };
        let point = reference.to_geodetic(Length::new::<meter>(25.0), Length::new::<meter>(-50.0));
        assert_relative_eq!(point.latitude, 9.5);
        assert_relative_eq!(point.longitude, 20.5);
    }

    quickcheck! {
        fn conversion_is_linear(x: i16, y: i16) -> bool {
            let (x, y) = (x as f64, y as f64);
            let (lat, lon) = meters_to_gps(x, y, LAT0, LON0);
            let (lat2, lon2) = meters_to_gps(2.0 * x, 2.0 * y, LAT0, LON0);
            approx::relative_eq!(lat2 - LAT0, 2.0 * (lat - LAT0), epsilon = 1e-9)
                && approx::relative_eq!(lon2 - LON0, 2.0 * (lon - LON0), epsilon = 1e-9)
        }
    }
}
