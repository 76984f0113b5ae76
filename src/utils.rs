/// Speed of light (m/s)
pub const SPEED_OF_LIGHT: f64 = 2.99792458e8;

/// L1 carrier frequency (Hz)
pub const L1_FREQUENCY: f64 = 1575.42e6;

/// L1 wavelength (m)
pub const L1_WAVELENGTH: f64 = SPEED_OF_LIGHT / L1_FREQUENCY;

/// π as defined by the GPS interface specification
pub const GPS_PI: f64 = 3.1415926535898;

const WGS84_SEMI_MAJOR_AXIS: f64 = 6378137.0;
const WGS84_FLATTENING: f64 = 1.0 / 298.257223563;

/// Converts WGS84 geodetic coordinates (decimal degrees, meters)
/// to ECEF coordinates (meters).
pub fn llh_to_ecef(lat_ddeg: f64, lon_ddeg: f64, height_m: f64) -> (f64, f64, f64) {
    let lat = lat_ddeg * GPS_PI / 180.0;
    let lon = lon_ddeg * GPS_PI / 180.0;

    let e2 = WGS84_FLATTENING * (2.0 - WGS84_FLATTENING);
    let n = WGS84_SEMI_MAJOR_AXIS / (1.0 - e2 * lat.sin().powi(2)).sqrt();

    (
        (n + height_m) * lat.cos() * lon.cos(),
        (n + height_m) * lat.cos() * lon.sin(),
        (n * (1.0 - e2) + height_m) * lat.sin(),
    )
}

/// Converts radians to decimal degrees, consistently with [llh_to_ecef]
pub fn rad_to_ddeg(rad: f64) -> f64 {
    rad * 180.0 / GPS_PI
}

/// Quantizes the raw signal metric into a RINEX signal strength digit
pub fn signal_strength(metric: u16) -> u8 {
    match metric {
        9000.. => 9,
        6000.. => 8,
        4000.. => 7,
        2500.. => 6,
        _ => 5,
    }
}

#[cfg(test)]
mod test {
    use super::{llh_to_ecef, rad_to_ddeg, signal_strength};

    #[test]
    fn ecef_conversion() {
        let (x, y, z) = llh_to_ecef(0.0, 0.0, 0.0);
        assert!((x - 6378137.0).abs() < 1.0E-6);
        assert!(y.abs() < 1.0E-6);
        assert!(z.abs() < 1.0E-6);

        let (x, y, z) = llh_to_ecef(90.0, 0.0, 0.0);
        assert!(x.abs() < 1.0E-3);
        assert!(y.abs() < 1.0E-3);
        assert!((z - 6356752.3142).abs() < 1.0E-3);

        let (x, y, z) = llh_to_ecef(40.0, -105.0, 1600.0);
        assert!((x - -1_266_643.136).abs() < 1.0E-2, "x={}", x);
        assert!((y - -4_727_176.539).abs() < 1.0E-2, "y={}", y);
        assert!((z - 4_079_014.032).abs() < 1.0E-2, "z={}", z);
    }

    #[test]
    fn rad_to_ddeg_is_consistent() {
        assert!((rad_to_ddeg(super::GPS_PI) - 180.0).abs() < 1.0E-12);
    }

    #[test]
    fn signal_strength_buckets() {
        for (metric, digit) in [
            (12000, 9),
            (9000, 9),
            (8999, 8),
            (6000, 8),
            (4000, 7),
            (3999, 6),
            (2500, 6),
            (2499, 5),
            (0, 5),
        ] {
            assert_eq!(signal_strength(metric), digit, "metric={}", metric);
        }
    }
}
