//! Destination grid planning
//!
//! The destination extent is the envelope of the source boundary, sampled
//! densely and projected into the target CRS. The pixel size keeps the
//! number of pixels along the diagonal of the extent equal to the source's
//! pixel diagonal, which approximately preserves source resolution.

use std::fmt;

use log::{debug, info};

use crate::coordinate::{AffineTransform, CoordinateTransformer, Crs};

use super::errors::{ReprojectError, ReprojectResult};

/// Boundary points sampled per source edge, corners included
pub const DEFAULT_BOUNDARY_SAMPLES: usize = 21;

/// Slack applied before rounding extents up to whole pixels
const ROUNDING_EPSILON: f64 = 1e-9;

/// Geometry of the destination raster, fixed once per run
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationPlan {
    pub width: usize,
    pub height: usize,
    pub transform: AffineTransform,
    pub crs: Crs,
}

impl fmt::Display for DestinationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} in {} with transform {}", self.width, self.height, self.crs, self.transform)
    }
}

/// Computes destination plans
#[derive(Debug, Clone, Copy)]
pub struct TransformPlanner {
    boundary_samples: usize,
}

impl Default for TransformPlanner {
    fn default() -> Self {
        TransformPlanner::new(DEFAULT_BOUNDARY_SAMPLES)
    }
}

impl TransformPlanner {
    pub fn new(boundary_samples: usize) -> Self {
        TransformPlanner { boundary_samples: boundary_samples.max(2) }
    }

    /// Plans the destination grid for a `source_width` x `source_height`
    /// raster placed by `source_transform` in `source_crs`
    pub fn plan(
        &self,
        source_crs: &Crs,
        dest_crs: &Crs,
        source_width: usize,
        source_height: usize,
        source_transform: &AffineTransform,
    ) -> ReprojectResult<DestinationPlan> {
        if source_width == 0 || source_height == 0 || !source_transform.is_valid() {
            return Err(ReprojectError::DegenerateExtent(format!(
                "{}x{} source with transform {}", source_width, source_height, source_transform
            )));
        }

        if source_crs == dest_crs {
            debug!("Source and destination CRS are both {}, keeping the source grid", dest_crs);
            return Ok(DestinationPlan {
                width: source_width,
                height: source_height,
                transform: *source_transform,
                crs: dest_crs.clone(),
            });
        }

        let transformer = CoordinateTransformer::new(source_crs, dest_crs)?;
        let source_bounds = source_transform.bounds(source_width, source_height);
        let extent = transformer.transform_bbox(&source_bounds, self.boundary_samples)
            .filter(|bbox| !bbox.is_degenerate())
            .ok_or_else(|| ReprojectError::DegenerateExtent(format!(
                "bounds ({}, {}, {}, {}) do not project to an area in {}",
                source_bounds.min_x, source_bounds.min_y, source_bounds.max_x, source_bounds.max_y, dest_crs
            )))?;

        let source_diagonal = (source_width as f64).hypot(source_height as f64);
        let resolution = extent.width().hypot(extent.height()) / source_diagonal;
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(ReprojectError::DegenerateExtent(format!("pixel size {} in {}", resolution, dest_crs)));
        }

        let width = ((extent.width() / resolution - ROUNDING_EPSILON).ceil() as usize).max(1);
        let height = ((extent.height() / resolution - ROUNDING_EPSILON).ceil() as usize).max(1);
        let transform = AffineTransform::from_origin(extent.min_x, extent.max_y, resolution, resolution);

        let plan = DestinationPlan { width, height, transform, crs: dest_crs.clone() };
        info!("Planned destination: {}", plan);
        Ok(plan)
    }
}
