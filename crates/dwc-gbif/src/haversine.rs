const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two lat/lon points in kilometers (§4.9).
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;
    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        assert!(haversine_km(50.0, -105.0, 50.0, -105.0) < 1e-9);
    }

    #[test]
    fn matches_spec_seed_scenario() {
        let distance = haversine_km(50.000, -105.000, 50.200, -105.000);
        assert!(
            (distance - 22.24).abs() < 0.1,
            "expected ~22.24km, got {distance}"
        );
    }
}
