//! Coordinate transformation functionality
//!
//! WGS 84, Web Mercator and UTM are projected natively. Any other pair of
//! systems goes through proj4rs with definitions from `crs-definitions`.

use std::f64::consts::PI;

use log::debug;
use proj4rs::proj::Proj;

use super::bbox::BoundingBox;
use super::crs::{CoordinateSystem, Crs};
use super::point::Point;
use super::utm::UtmZone;
use crate::reproject::errors::{ReprojectError, ReprojectResult};

/// Earth radius in meters
const EARTH_RADIUS: f64 = 6378137.0;

/// Latitude at which Web Mercator becomes a square world
pub const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

enum Backend {
    Identity,
    Native,
    Proj4 { source: Proj, target: Proj },
}

/// Transformer between a fixed pair of coordinate systems
///
/// Points that cannot be represented in the other system (beyond a
/// projection's domain, or rejected by proj4rs) yield `None`.
pub struct CoordinateTransformer {
    source: Crs,
    target: Crs,
    backend: Backend,
}

impl CoordinateTransformer {
    /// Build a transformer from `source` to `target`
    pub fn new(source: &Crs, target: &Crs) -> ReprojectResult<Self> {
        let backend = if source == target {
            Backend::Identity
        } else if source.system().is_native() && target.system().is_native() {
            Backend::Native
        } else {
            Backend::Proj4 {
                source: Self::build_proj(source)?,
                target: Self::build_proj(target)?,
            }
        };

        debug!("Transformer {} -> {} ({})", source, target, match backend {
            Backend::Identity => "identity",
            Backend::Native => "native",
            Backend::Proj4 { .. } => "proj4rs",
        });

        Ok(CoordinateTransformer { source: source.clone(), target: target.clone(), backend })
    }

    fn build_proj(crs: &Crs) -> ReprojectResult<Proj> {
        let definition = crs.proj4_definition()
            .ok_or(ReprojectError::UnknownEpsg(crs.epsg_code()))?;
        Proj::from_proj_string(definition)
            .map_err(|e| ReprojectError::InvalidCrs(format!("{}: {:?}", crs, e)))
    }

    pub fn source(&self) -> &Crs {
        &self.source
    }

    pub fn target(&self) -> &Crs {
        &self.target
    }

    /// Whether both ends are the same system
    pub fn is_identity(&self) -> bool {
        matches!(self.backend, Backend::Identity)
    }

    /// Transform a point from the source system to the target system
    pub fn forward(&self, point: Point) -> Option<Point> {
        match &self.backend {
            Backend::Identity => Some(point),
            Backend::Native => Self::native(point, &self.source, &self.target),
            Backend::Proj4 { source, target } => Self::via_proj4(point, source, target, &self.source, &self.target),
        }
    }

    /// Transform a point from the target system back to the source system
    pub fn inverse(&self, point: Point) -> Option<Point> {
        match &self.backend {
            Backend::Identity => Some(point),
            Backend::Native => Self::native(point, &self.target, &self.source),
            Backend::Proj4 { source, target } => Self::via_proj4(point, target, source, &self.target, &self.source),
        }
    }

    /// Envelope of a source-system box in the target system
    ///
    /// Samples `per_edge` points along each edge so that curved edges are
    /// enclosed; unrepresentable samples are skipped.
    pub fn transform_bbox(&self, bbox: &BoundingBox, per_edge: usize) -> Option<BoundingBox> {
        if self.is_identity() {
            return Some(*bbox);
        }
        let projected = bbox.boundary_points(per_edge)
            .into_iter()
            .filter_map(|p| self.forward(p));
        BoundingBox::from_points(projected)
    }

    fn native(point: Point, from: &Crs, to: &Crs) -> Option<Point> {
        let (lon, lat) = to_geographic(from.system(), point)?;
        let result = from_geographic(to.system(), lon, lat)?;
        if result.is_finite() { Some(result) } else { None }
    }

    fn via_proj4(point: Point, from_proj: &Proj, to_proj: &Proj, from: &Crs, to: &Crs) -> Option<Point> {
        if !point.is_finite() {
            return None;
        }
        // proj4rs works in radians for geographic systems
        let mut coords = if from.is_geographic() {
            (point.x.to_radians(), point.y.to_radians(), 0.0)
        } else {
            (point.x, point.y, 0.0)
        };
        proj4rs::transform::transform(from_proj, to_proj, &mut coords).ok()?;

        let result = if to.is_geographic() {
            Point::new(coords.0.to_degrees(), coords.1.to_degrees())
        } else {
            Point::new(coords.0, coords.1)
        };
        if result.is_finite() { Some(result) } else { None }
    }
}

/// Convert from WGS84 (EPSG:4326) to Web Mercator (EPSG:3857)
///
/// Latitudes beyond the Web Mercator limit are clamped to it.
pub fn wgs84_to_web_mercator(lon: f64, lat: f64) -> Point {
    let lat = lat.clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT);

    let x = lon * EARTH_RADIUS * PI / 180.0;
    let y = f64::ln(f64::tan((90.0 + lat) * PI / 360.0)) * EARTH_RADIUS;

    Point::new(x, y)
}

/// Convert from Web Mercator (EPSG:3857) to WGS84 (EPSG:4326)
pub fn web_mercator_to_wgs84(x: f64, y: f64) -> Point {
    let lon = x * 180.0 / (EARTH_RADIUS * PI);
    let lat = 180.0 / PI * (2.0 * f64::atan(f64::exp(y / EARTH_RADIUS)) - PI / 2.0);

    Point::new(lon, lat)
}

fn to_geographic(system: CoordinateSystem, point: Point) -> Option<(f64, f64)> {
    match system {
        CoordinateSystem::WGS84 => Some((point.x, point.y)),
        CoordinateSystem::WebMercator => {
            let p = web_mercator_to_wgs84(point.x, point.y);
            Some((p.x, p.y))
        },
        CoordinateSystem::UTM(zone, northern) => UtmZone::new(zone, northern).inverse(point.x, point.y),
        CoordinateSystem::Other(_) => None,
    }
}

fn from_geographic(system: CoordinateSystem, lon: f64, lat: f64) -> Option<Point> {
    match system {
        CoordinateSystem::WGS84 => Some(Point::new(lon, lat)),
        CoordinateSystem::WebMercator => Some(wgs84_to_web_mercator(lon, lat)),
        CoordinateSystem::UTM(zone, northern) => UtmZone::new(zone, northern)
            .forward(lon, lat)
            .map(|(x, y)| Point::new(x, y)),
        CoordinateSystem::Other(_) => None,
    }
}
