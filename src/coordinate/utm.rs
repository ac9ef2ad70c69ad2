//! Universal Transverse Mercator on the WGS 84 ellipsoid
//!
//! Series expansions after Snyder, "Map Projections: A Working Manual",
//! equations 8-9 to 8-10 (forward) and 8-17 to 8-25 (inverse).

const A: f64 = 6378137.0;
const F: f64 = 1.0 / 298.257223563;
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500000.0;
const FALSE_NORTHING_SOUTH: f64 = 10000000.0;

/// A single UTM zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtmZone {
    zone: u8,
    northern: bool,
}

impl UtmZone {
    pub fn new(zone: u8, northern: bool) -> Self {
        UtmZone { zone, northern }
    }

    /// Central meridian in degrees
    pub fn central_meridian(&self) -> f64 {
        (self.zone as f64 - 1.0) * 6.0 - 180.0 + 3.0
    }

    fn false_northing(&self) -> f64 {
        if self.northern { 0.0 } else { FALSE_NORTHING_SOUTH }
    }

    /// Geographic degrees to easting/northing in metres
    pub fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if !lon.is_finite() || lat.is_nan() || lat.abs() >= 90.0 {
            return None;
        }

        let e2 = F * (2.0 - F);
        let ep2 = e2 / (1.0 - e2);

        let phi = lat.to_radians();
        let dlam = (lon - self.central_meridian()).to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let tan_phi = phi.tan();

        let n = A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = cos_phi * dlam;
        let m = meridian_arc(phi, e2);

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let x = K0 * n * (a + (1.0 - t + c) * a3 / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0);
        let y = K0 * (m + n * tan_phi * (a2 / 2.0
            + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
            + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));

        Some((x + FALSE_EASTING, y + self.false_northing()))
    }

    /// Easting/northing in metres to geographic degrees
    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }

        let e2 = F * (2.0 - F);
        let ep2 = e2 / (1.0 - e2);
        let e4 = e2 * e2;
        let e6 = e4 * e2;

        let m = (y - self.false_northing()) / K0;
        let mu = m / (A * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

        let sqrt_1me2 = (1.0 - e2).sqrt();
        let e1 = (1.0 - sqrt_1me2) / (1.0 + sqrt_1me2);
        let e1_2 = e1 * e1;
        let e1_3 = e1_2 * e1;
        let e1_4 = e1_3 * e1;

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

        let (sin_phi1, cos_phi1) = phi1.sin_cos();
        let tan_phi1 = phi1.tan();
        let c1 = ep2 * cos_phi1 * cos_phi1;
        let t1 = tan_phi1 * tan_phi1;
        let denom = 1.0 - e2 * sin_phi1 * sin_phi1;
        let n1 = A / denom.sqrt();
        let r1 = A * (1.0 - e2) / denom.powf(1.5);
        let d = (x - FALSE_EASTING) / (n1 * K0);

        let d2 = d * d;
        let d3 = d2 * d;
        let d4 = d3 * d;
        let d5 = d4 * d;
        let d6 = d5 * d;

        let phi = phi1 - (n1 * tan_phi1 / r1) * (d2 / 2.0
            - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d4 / 24.0
            + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1) * d6 / 720.0);
        let dlam = (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d5 / 120.0)
            / cos_phi1;

        let lon = self.central_meridian() + dlam.to_degrees();
        let lat = phi.to_degrees();
        if lon.is_finite() && lat.is_finite() {
            Some((lon, lat))
        } else {
            None
        }
    }
}

/// Distance along the meridian from the equator to latitude `phi` (radians)
fn meridian_arc(phi: f64, e2: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    A * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_central_meridian_maps_to_false_easting() {
        let zone = UtmZone::new(33, true);
        assert_eq!(zone.central_meridian(), 15.0);
        let (x, y) = zone.forward(15.0, 0.0).unwrap();
        assert!((x - 500000.0).abs() < 1e-6);
        assert!(y.abs() < 1e-6);
    }

    #[test]
    fn test_known_point() {
        // 16E 48N lies in zone 33N at roughly (574595, 5316784)
        let (x, y) = UtmZone::new(33, true).forward(16.0, 48.0).unwrap();
        assert!((x - 574_595.0).abs() < 5.0, "x = {}", x);
        assert!((y - 5_316_784.0).abs() < 5.0, "y = {}", y);
    }

    #[test]
    fn test_round_trip_both_hemispheres() {
        for (zone, lon, lat) in [(UtmZone::new(31, true), 3.5, 51.2), (UtmZone::new(23, false), -44.0, -22.9)] {
            let (x, y) = zone.forward(lon, lat).unwrap();
            let (lon2, lat2) = zone.inverse(x, y).unwrap();
            assert!((lon - lon2).abs() < 1e-7);
            assert!((lat - lat2).abs() < 1e-7);
        }
    }

    #[test]
    fn test_southern_false_northing() {
        let (_, y) = UtmZone::new(23, false).forward(-45.0, -0.0001).unwrap();
        assert!(y < 10_000_000.0 && y > 9_999_900.0);
    }

    #[test]
    fn test_pole_rejected() {
        assert!(UtmZone::new(33, true).forward(15.0, 90.0).is_none());
    }
}
