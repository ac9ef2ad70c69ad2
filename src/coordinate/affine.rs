//! Affine pixel-to-map transforms

use std::fmt;

use super::bbox::BoundingBox;
use super::point::Point;

/// Six-coefficient affine transform from pixel (col, row) to map (x, y)
///
/// ```text
/// x = a * col + b * row + c
/// y = d * col + e * row + f
/// ```
///
/// `(0, 0)` is the outer top-left corner of the top-left pixel. North-up
/// rasters have `b == d == 0` and a negative `e`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl AffineTransform {
    /// Create a transform from its coefficients
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        AffineTransform { a, b, c, d, e, f }
    }

    /// North-up transform anchored at the top-left corner `(x, y)`
    ///
    /// `pixel_height` is the positive ground size of a row; it is negated
    /// for the `e` coefficient.
    pub fn from_origin(x: f64, y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        AffineTransform::new(pixel_width, 0.0, x, 0.0, -pixel_height, y)
    }

    /// Create from a GDAL-style geotransform `[c, a, b, f, d, e]`
    pub fn from_gdal(gt: &[f64; 6]) -> Self {
        AffineTransform::new(gt[1], gt[2], gt[0], gt[4], gt[5], gt[3])
    }

    /// Convert to a GDAL-style geotransform `[c, a, b, f, d, e]`
    pub fn to_gdal(&self) -> [f64; 6] {
        [self.c, self.a, self.b, self.f, self.d, self.e]
    }

    /// Coefficients in `[a, b, c, d, e, f]` order
    pub fn coefficients(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Map a pixel coordinate to map space
    pub fn apply(&self, col: f64, row: f64) -> Point {
        Point::new(
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    /// Inverse transform (map to pixel), or `None` if singular
    pub fn inverse(&self) -> Option<AffineTransform> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(AffineTransform {
            a: self.e * inv_det,
            b: -self.b * inv_det,
            c: (self.b * self.f - self.e * self.c) * inv_det,
            d: -self.d * inv_det,
            e: self.a * inv_det,
            f: (self.d * self.c - self.a * self.f) * inv_det,
        })
    }

    /// No rotation or shear terms
    pub fn is_north_up(&self) -> bool {
        self.b == 0.0 && self.d == 0.0
    }

    /// Finite coefficients, non-zero pixel sizes and an invertible matrix
    pub fn is_valid(&self) -> bool {
        self.coefficients().iter().all(|v| v.is_finite())
            && self.a != 0.0
            && self.e != 0.0
            && self.determinant() != 0.0
    }

    /// Ground size of one pixel along x and y, always positive
    pub fn pixel_size(&self) -> (f64, f64) {
        (self.a.hypot(self.d), self.b.hypot(self.e))
    }

    /// Map-space envelope of a `width` x `height` raster
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
        let (w, h) = (width as f64, height as f64);
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(w, 0.0),
            self.apply(0.0, h),
            self.apply(w, h),
        ];
        BoundingBox::from_points(corners)
            .unwrap_or_else(|| BoundingBox::new(f64::NAN, f64::NAN, f64::NAN, f64::NAN))
    }
}

impl fmt::Display for AffineTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {}, {}, {})", self.a, self.b, self.c, self.d, self.e, self.f)
    }
}
