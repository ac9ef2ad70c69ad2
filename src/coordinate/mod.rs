//! Coordinate handling for geospatial data
//!
//! Points, boxes, affine pixel transforms and the CRS machinery used to
//! move coordinates between EPSG systems.

mod affine;
mod bbox;
mod point;
mod transform;
mod utm;
mod crs;

// Re-export key types
pub use self::affine::AffineTransform;
pub use self::bbox::BoundingBox;
pub use self::point::Point;
pub use self::transform::{CoordinateTransformer, wgs84_to_web_mercator, web_mercator_to_wgs84, WEB_MERCATOR_MAX_LAT};
pub use self::utm::UtmZone;
pub use self::crs::{CoordinateSystem, Crs, CrsResolver};
