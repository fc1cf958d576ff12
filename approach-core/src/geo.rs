//! Great-circle geodesy on a spherical Earth.

use crate::types::Position;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres (haversine).
pub fn distance_km(a: Position, b: Position) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Initial great-circle bearing from `a` to `b`, compass degrees in [0, 360).
pub fn bearing_deg(a: Position, b: Position) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let x = dlon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    normalize_deg(x.atan2(y).to_degrees())
}

/// Smallest absolute difference between two headings, in [0, 180].
pub fn heading_deviation_deg(track: f64, bearing: f64) -> f64 {
    let diff = normalize_deg(track - bearing);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Wrap any angle into [0, 360).
pub fn normalize_deg(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BKK: Position = Position::new(13.6811, 100.7475);
    const DMK: Position = Position::new(13.9126, 100.6068);

    #[test]
    fn test_distance_same_point() {
        assert_eq!(distance_km(BKK, BKK), 0.0);
    }

    #[test]
    fn test_distance_symmetric() {
        let d1 = distance_km(BKK, DMK);
        let d2 = distance_km(DMK, BKK);
        assert!((d1 - d2).abs() < 1e-9);
    }

    #[test]
    fn test_distance_known() {
        // Suvarnabhumi to Don Mueang: ~30 km
        let d = distance_km(BKK, DMK);
        assert!(d > 25.0 && d < 35.0, "BKK-DMK should be ~30 km, got {d}");
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let d = distance_km(Position::new(0.0, 0.0), Position::new(1.0, 0.0));
        assert!((d - 111.19).abs() < 0.1, "got {d}");
    }

    #[test]
    fn test_distance_antipodal() {
        let d = distance_km(Position::new(0.0, 0.0), Position::new(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_bearing_cardinal() {
        let origin = Position::new(0.0, 0.0);
        assert!((bearing_deg(origin, Position::new(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((bearing_deg(origin, Position::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((bearing_deg(origin, Position::new(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((bearing_deg(origin, Position::new(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_range_and_asymmetry() {
        let points = [
            BKK,
            DMK,
            Position::new(-33.9, 151.2),
            Position::new(51.47, -0.45),
            Position::new(64.1, -21.9),
        ];
        for a in points {
            for b in points {
                if a == b {
                    continue;
                }
                let fwd = bearing_deg(a, b);
                assert!((0.0..360.0).contains(&fwd), "bearing {fwd} out of range");
                assert!((fwd - bearing_deg(b, a)).abs() > 1e-6);
            }
        }
    }

    #[test]
    fn test_heading_deviation() {
        assert_eq!(heading_deviation_deg(10.0, 350.0), 20.0);
        assert_eq!(heading_deviation_deg(350.0, 10.0), 20.0);
        assert_eq!(heading_deviation_deg(90.0, 270.0), 180.0);
        assert_eq!(heading_deviation_deg(45.0, 45.0), 0.0);
    }

    #[test]
    fn test_normalize_deg() {
        assert_eq!(normalize_deg(-90.0), 270.0);
        assert_eq!(normalize_deg(720.0), 0.0);
        assert!(normalize_deg(-1e-15) < 360.0);
    }
}
