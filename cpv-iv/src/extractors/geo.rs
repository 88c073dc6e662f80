//! Great-circle distance helpers

use crate::types::GeoPoint;

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points, in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * h.sqrt().asin() * EARTH_RADIUS_KM
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(latitude: f64, longitude: f64) -> GeoPoint {
        GeoPoint {
            latitude,
            longitude,
        }
    }

    #[test]
    fn zero_distance_for_same_point() {
        let jaipur = point(26.9124, 75.7873);
        assert_eq!(haversine_km(jaipur, jaipur), 0.0);
    }

    #[test]
    fn one_degree_longitude_at_equator() {
        // One degree of longitude on the equator is ~111.19 km
        let d = haversine_km(point(0.0, 0.0), point(0.0, 1.0));
        assert!((d - 111.19).abs() < 0.1, "got {}", d);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = point(26.9124, 75.7873);
        let b = point(28.6139, 77.2090);
        let forward = haversine_km(a, b);
        let back = haversine_km(b, a);
        assert!((forward - back).abs() < 1e-9);
        // Jaipur to Delhi is roughly 240 km as the crow flies
        assert!(forward > 220.0 && forward < 260.0, "got {}", forward);
    }
}
