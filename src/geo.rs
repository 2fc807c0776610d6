/// Great-circle distance in meters between two WGS84 coordinates (haversine).
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        assert_eq!(distance_meters(48.2, 16.37, 48.2, 16.37), 0.0);
    }

    #[test]
    fn test_known_distance_stephansplatz_karlsplatz() {
        // Stephansplatz to Karlsplatz is roughly 1.1 km
        let d = distance_meters(48.20849, 16.37208, 48.20021, 16.36963);
        assert!(d > 900.0 && d < 1100.0, "got {d}");
    }

    #[test]
    fn test_symmetry() {
        let a = distance_meters(48.1, 16.3, 48.3, 16.5);
        let b = distance_meters(48.3, 16.5, 48.1, 16.3);
        assert!((a - b).abs() < 1e-6);
    }
}
