//! Axis-aligned bounding boxes in map coordinates

use super::point::Point;

/// A bounding box in a coordinate system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum X coordinate
    pub min_x: f64,
    /// Minimum Y coordinate
    pub min_y: f64,
    /// Maximum X coordinate
    pub max_x: f64,
    /// Maximum Y coordinate
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        BoundingBox { min_x, min_y, max_x, max_y }
    }

    /// Smallest box containing every finite point, or `None` if there are none
    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Option<Self> {
        let mut bbox: Option<BoundingBox> = None;
        for point in points.into_iter().filter(Point::is_finite) {
            bbox = Some(match bbox {
                None => BoundingBox::new(point.x, point.y, point.x, point.y),
                Some(b) => b.expand_to_include(&point),
            });
        }
        bbox
    }

    /// Returns this box grown to include `point`
    pub fn expand_to_include(&self, point: &Point) -> Self {
        BoundingBox::new(
            self.min_x.min(point.x),
            self.min_y.min(point.y),
            self.max_x.max(point.x),
            self.max_y.max(point.y),
        )
    }

    /// Get the width of the bounding box
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Get the height of the bounding box
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Get the center point of the bounding box
    pub fn center(&self) -> Point {
        Point::new(
            self.min_x + self.width() / 2.0,
            self.min_y + self.height() / 2.0,
        )
    }

    /// Zero or negative area, or non-finite edges
    pub fn is_degenerate(&self) -> bool {
        let finite = self.min_x.is_finite() && self.min_y.is_finite()
            && self.max_x.is_finite() && self.max_y.is_finite();
        !finite || self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Check if this bounding box contains a point
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.min_x && point.x <= self.max_x &&
            point.y >= self.min_y && point.y <= self.max_y
    }

    /// Check if `other` lies inside this box, allowing `tolerance` on every edge
    pub fn contains_bbox(&self, other: &BoundingBox, tolerance: f64) -> bool {
        other.min_x >= self.min_x - tolerance && other.max_x <= self.max_x + tolerance &&
            other.min_y >= self.min_y - tolerance && other.max_y <= self.max_y + tolerance
    }

    /// Points evenly spaced along the boundary, `per_edge` per side including corners
    pub fn boundary_points(&self, per_edge: usize) -> Vec<Point> {
        let steps = per_edge.max(2) - 1;
        let mut points = Vec::with_capacity(steps * 4);
        for i in 0..steps {
            let t = i as f64 / steps as f64;
            let x = self.min_x + t * self.width();
            let y = self.min_y + t * self.height();
            points.push(Point::new(x, self.max_y));
            points.push(Point::new(self.max_x - t * self.width(), self.min_y));
            points.push(Point::new(self.min_x, y));
            points.push(Point::new(self.max_x, self.max_y - t * self.height()));
        }
        points
    }
}
