/// WGS84 semi-major axis used by the spherical Web Mercator projection
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Project latitude/longitude in degrees to EPSG:3857 meters.
///
/// Out of range inputs give `(inf, inf)`.
pub fn lat_lon_to_web_mercator(lat: f64, lon: f64) -> (f64, f64) {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return (f64::INFINITY, f64::INFINITY);
    }
    let x = EARTH_RADIUS_M * lon.to_radians();
    let y = EARTH_RADIUS_M * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_mercator() {
        let (x, y) = lat_lon_to_web_mercator(50.0, -50.0);
        assert!((x - -5_565_974.539_663_672).abs() < 1e-3);
        assert!((y - 6_446_275.841_017_148).abs() < 1e-3);
    }

    #[test]
    fn test_web_mercator_origin() {
        let (x, y) = lat_lon_to_web_mercator(0.0, 0.0);
        assert_eq!(x, 0.0);
        assert!(y.abs() < 1e-9);
    }

    #[test]
    fn test_web_mercator_out_of_range() {
        assert_eq!(lat_lon_to_web_mercator(91.0, 0.0), (f64::INFINITY, f64::INFINITY));
        assert_eq!(lat_lon_to_web_mercator(0.0, 181.0), (f64::INFINITY, f64::INFINITY));
        assert_eq!(lat_lon_to_web_mercator(f64::NAN, 0.0), (f64::INFINITY, f64::INFINITY));
    }
}
