use serde::{Deserialize, Serialize};

/// A "part" of a location
pub type LocationComponent = f64;

/// Mean radius of the Earth, used for great-circle distances
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// Some location in the world, in decimal degrees
pub struct Location {
    /// Latitude
    pub lat: LocationComponent,
    /// Longitude
    pub long: LocationComponent,
}

impl Location {
    pub const fn new(lat: LocationComponent, long: LocationComponent) -> Self {
        Self { lat, long }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.long.is_finite()
    }

    /// Finite and inside the valid latitude / longitude ranges
    pub fn is_valid(&self) -> bool {
        self.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.long)
    }

    /// Great-circle (haversine) distance to `other` in meters.
    ///
    /// Returns NaN if either location has a non-finite component.
    pub fn distance_to(&self, other: &Location) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lat = (other.lat - self.lat).to_radians();
        let d_long = (other.long - self.long).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_long / 2.0).sin().powi(2);
        // Rounding can push `a` a hair past 1 for antipodal points, clamp keeps NaN as NaN
        let c = 2.0 * a.sqrt().clamp(0.0, 1.0).asin();

        EARTH_RADIUS_METERS * c
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// The visible area of the map
pub struct MapRegion {
    /// Center of the visible area
    pub center: Location,
    /// Height of the visible area in degrees of latitude
    pub lat_delta: LocationComponent,
    /// Width of the visible area in degrees of longitude
    pub long_delta: LocationComponent,
}

impl MapRegion {
    /// A square region of `span` degrees around `center`
    pub const fn around(center: Location, span: LocationComponent) -> Self {
        Self {
            center,
            lat_delta: span,
            long_delta: span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANN_ARBOR: Location = Location::new(42.2808, -83.7430);

    #[test]
    fn test_zero_distance() {
        assert_eq!(ANN_ARBOR.distance_to(&ANN_ARBOR), 0.0);
    }

    #[test]
    fn test_known_distance() {
        let berlin = Location::new(52.5200, 13.4050);
        let paris = Location::new(48.8566, 2.3522);
        let km = berlin.distance_to(&paris) / 1000.0;
        assert!((km - 878.0).abs() < 5.0, "Berlin to Paris was {km} km");
    }

    #[test]
    fn test_longitude_scales_with_latitude() {
        // One degree of longitude shrinks towards the poles, one degree of latitude doesn't
        let equator = Location::new(0.0, 0.0).distance_to(&Location::new(0.0, 1.0));
        let north = Location::new(60.0, 0.0).distance_to(&Location::new(60.0, 1.0));
        assert!((north / equator - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_non_finite_distance_is_nan() {
        let bad = Location::new(f64::NAN, 0.0);
        assert!(bad.distance_to(&ANN_ARBOR).is_nan());
        assert!(ANN_ARBOR.distance_to(&bad).is_nan());
        assert!(
            Location::new(0.0, f64::INFINITY)
                .distance_to(&ANN_ARBOR)
                .is_nan()
        );
        assert!(!bad.is_finite());
        assert!(!Location::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_antipodal_distance() {
        let far = Location::new(0.0, 0.0).distance_to(&Location::new(0.0, 180.0));
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_METERS;
        assert!((far - half_circumference).abs() < 1.0);
    }

    #[test]
    fn test_out_of_range_is_invalid() {
        assert!(Location::new(90.0, -180.0).is_valid());
        assert!(!Location::new(90.5, 0.0).is_valid());
        assert!(!Location::new(0.0, 181.0).is_valid());
    }
}
