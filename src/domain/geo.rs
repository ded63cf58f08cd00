use crate::domain::models::GeoPoint;

/// Spherical earth radius in meters, matching common 2dsphere engines.
pub const EARTH_RADIUS_M: f64 = 6_378_100.0;

pub const DEFAULT_NEARBY_DISTANCE_M: u32 = 10_000;

/// Great-circle distance in meters between two longitude/latitude pairs (degrees).
pub fn distance_m(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
}

pub fn distance_between(a: GeoPoint, b: GeoPoint) -> f64 {
    distance_m(a.longitude, a.latitude, b.longitude, b.latitude)
}

/// Lat/lon rectangle that contains every point within a radius of a center.
/// Used as an index prefilter; the exact distance check happens afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    pub fn around(center: GeoPoint, radius_m: f64) -> Self {
        let angular = (radius_m / EARTH_RADIUS_M).to_degrees();
        let min_latitude = center.latitude - angular;
        let max_latitude = center.latitude + angular;

        // Near a pole or across the antimeridian the longitude span is unbounded.
        if min_latitude <= -90.0 || max_latitude >= 90.0 {
            return Self {
                min_latitude: min_latitude.max(-90.0),
                max_latitude: max_latitude.min(90.0),
                min_longitude: -180.0,
                max_longitude: 180.0,
            };
        }

        let lat_rad = center.latitude.to_radians();
        let lon_delta = ((radius_m / EARTH_RADIUS_M).sin() / lat_rad.cos())
            .min(1.0)
            .asin()
            .to_degrees();
        let min_longitude = center.longitude - lon_delta;
        let max_longitude = center.longitude + lon_delta;

        if min_longitude < -180.0 || max_longitude > 180.0 {
            return Self {
                min_latitude,
                max_latitude,
                min_longitude: -180.0,
                max_longitude: 180.0,
            };
        }

        Self {
            min_latitude,
            max_latitude,
            min_longitude,
            max_longitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundingBox, EARTH_RADIUS_M, distance_between, distance_m};
    use crate::domain::models::GeoPoint;

    fn contains(bbox: &BoundingBox, point: GeoPoint) -> bool {
        (bbox.min_latitude..=bbox.max_latitude).contains(&point.latitude)
            && (bbox.min_longitude..=bbox.max_longitude).contains(&point.longitude)
    }

    #[test]
    fn distance_is_zero_for_same_point() {
        assert_eq!(distance_m(12.5, 55.6, 12.5, 55.6), 0.0);
    }

    #[test]
    fn one_degree_of_latitude_matches_arc_length() {
        let expected = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        let distance = distance_m(0.0, 0.0, 0.0, 1.0);
        assert!((distance - expected).abs() < 0.01, "distance was {distance}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new(12.5683, 55.6761);
        let b = GeoPoint::new(13.4050, 52.5200);
        let ab = distance_between(a, b);
        let ba = distance_between(b, a);
        assert!((ab - ba).abs() < 1e-6);
        assert!(ab > 350_000.0 && ab < 360_000.0, "distance was {ab}");
    }

    #[test]
    fn bounding_box_contains_points_on_the_radius() {
        let center = GeoPoint::new(12.5, 55.6);
        let bbox = BoundingBox::around(center, 10_000.0);

        for (lon, lat) in [(12.5, 55.689), (12.5, 55.511), (12.658, 55.6), (12.342, 55.6)] {
            let point = GeoPoint::new(lon, lat);
            assert!(distance_between(center, point) <= 10_000.0);
            assert!(contains(&bbox, point), "bbox should contain {lon},{lat}");
        }
        assert!(!contains(&bbox, GeoPoint::new(12.5, 55.8)));
    }

    #[test]
    fn bounding_box_spans_all_longitudes_near_pole() {
        let bbox = BoundingBox::around(GeoPoint::new(0.0, 89.95), 10_000.0);
        assert_eq!(bbox.min_longitude, -180.0);
        assert_eq!(bbox.max_longitude, 180.0);
        assert_eq!(bbox.max_latitude, 90.0);
    }

    #[test]
    fn bounding_box_spans_all_longitudes_across_antimeridian() {
        let bbox = BoundingBox::around(GeoPoint::new(179.99, 0.0), 10_000.0);
        assert_eq!(bbox.min_longitude, -180.0);
        assert_eq!(bbox.max_longitude, 180.0);
    }
}
