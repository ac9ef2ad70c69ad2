//! Nearest-neighbour band resampling
//!
//! For every destination pixel the centre is projected back into the
//! source CRS and through the inverse source transform; the source pixel
//! containing that point supplies the value. The lookup depends only on
//! the geometry, so it is computed once as a `PixelMapping` and then
//! applied to each band in turn.

use log::debug;

use crate::coordinate::{AffineTransform, CoordinateTransformer, Crs, Point};
use crate::raster::sample::{map_band, BandData, Sample};

use super::errors::{ReprojectError, ReprojectResult};
use super::planner::DestinationPlan;

/// Marks destination pixels without source coverage
const NO_SOURCE: usize = usize::MAX;

/// Source pixel index for every destination pixel
#[derive(Debug, Clone, PartialEq)]
pub struct PixelMapping {
    width: usize,
    height: usize,
    indices: Vec<usize>,
}

impl PixelMapping {
    /// Builds the lookup from `plan`'s grid into a source grid
    pub fn build(
        source_transform: &AffineTransform,
        source_width: usize,
        source_height: usize,
        source_crs: &Crs,
        plan: &DestinationPlan,
    ) -> ReprojectResult<Self> {
        let transformer = CoordinateTransformer::new(source_crs, &plan.crs)?;

        if transformer.is_identity()
            && plan.transform == *source_transform
            && (plan.width, plan.height) == (source_width, source_height)
        {
            debug!("Identity pixel mapping for {}x{}", plan.width, plan.height);
            return Ok(PixelMapping {
                width: plan.width,
                height: plan.height,
                indices: (0..plan.width * plan.height).collect(),
            });
        }

        let to_source_pixel = source_transform.inverse()
            .ok_or_else(|| ReprojectError::DegenerateExtent(format!("source transform {} is singular", source_transform)))?;

        let (w, h) = (source_width as f64, source_height as f64);
        let mut indices = Vec::with_capacity(plan.width * plan.height);
        let mut covered = 0usize;

        for row in 0..plan.height {
            for col in 0..plan.width {
                let map = plan.transform.apply(col as f64 + 0.5, row as f64 + 0.5);
                let index = transformer.inverse(map)
                    .map(|p| to_source_pixel.apply(p.x, p.y))
                    .filter(|p| p.x >= 0.0 && p.x < w && p.y >= 0.0 && p.y < h)
                    .map(|Point { x, y }| y as usize * source_width + x as usize)
                    .unwrap_or(NO_SOURCE);
                if index != NO_SOURCE {
                    covered += 1;
                }
                indices.push(index);
            }
        }

        debug!("Pixel mapping {}x{}: {} of {} pixels covered by the source",
               plan.width, plan.height, covered, indices.len());
        Ok(PixelMapping { width: plan.width, height: plan.height, indices })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Source pixel feeding destination pixel (`col`, `row`), if any
    pub fn source_index(&self, col: usize, row: usize) -> Option<usize> {
        self.indices.get(row * self.width + col).copied().filter(|&i| i != NO_SOURCE)
    }

    /// Resamples one band, filling uncovered pixels with `nodata`
    ///
    /// The sample type of `source` is kept.
    pub fn apply(&self, source: &BandData, nodata: f64) -> BandData {
        fn gather<T: Sample>(values: &[T], indices: &[usize], nodata: f64) -> Vec<T> {
            let fill = T::from_f64(nodata);
            indices.iter()
                .map(|&i| values.get(i).copied().unwrap_or(fill))
                .collect()
        }

        map_band!(source, values => gather(values, &self.indices, nodata))
    }
}

/// Resamples a single band from its source grid onto `plan`
///
/// Convenience for one-off calls; the pipeline builds one `PixelMapping`
/// and reuses it for every band.
pub fn resample_band(
    source_band: &BandData,
    source_transform: &AffineTransform,
    source_width: usize,
    source_height: usize,
    source_crs: &Crs,
    plan: &DestinationPlan,
    nodata: f64,
) -> ReprojectResult<BandData> {
    let mapping = PixelMapping::build(source_transform, source_width, source_height, source_crs, plan)?;
    Ok(mapping.apply(source_band, nodata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::CrsResolver;
    use crate::reproject::planner::TransformPlanner;

    fn crs(code: u32) -> Crs {
        CrsResolver::resolve_epsg(code).unwrap()
    }

    #[test]
    fn test_identity_copies_values() {
        let transform = AffineTransform::new(1.0, 0.0, 0.0, 0.0, -1.0, 2.0);
        let plan = TransformPlanner::default().plan(&crs(4326), &crs(4326), 2, 2, &transform).unwrap();
        let band = BandData::F32(vec![1.5, -2.0, 3.25, f32::MAX]);

        let out = resample_band(&band, &transform, 2, 2, &crs(4326), &plan, 0.0).unwrap();
        assert_eq!(out, band);
    }

    #[test]
    fn test_shifted_grid_uses_nodata() {
        let source_transform = AffineTransform::from_origin(0.0, 2.0, 1.0, 1.0);
        let plan = DestinationPlan {
            width: 3,
            height: 2,
            transform: AffineTransform::from_origin(1.0, 2.0, 1.0, 1.0),
            crs: crs(4326),
        };
        let band = BandData::U16(vec![1, 2, 3, 4]);

        let out = resample_band(&band, &source_transform, 2, 2, &crs(4326), &plan, 255.0).unwrap();
        assert_eq!(out, BandData::U16(vec![2, 255, 255, 4, 255, 255]));
    }

    #[test]
    fn test_mapping_reused_across_bands() {
        let transform = AffineTransform::new(1.0, 0.0, 0.0, 0.0, -1.0, 2.0);
        let plan = TransformPlanner::default().plan(&crs(4326), &crs(3857), 2, 2, &transform).unwrap();
        let mapping = PixelMapping::build(&transform, 2, 2, &crs(4326), &plan).unwrap();
        assert_eq!((mapping.width(), mapping.height()), (2, 3));

        // Bottom row centres fall just south of the equator
        let red = mapping.apply(&BandData::U8(vec![1, 2, 3, 4]), 0.0);
        let green = mapping.apply(&BandData::U8(vec![10, 20, 30, 40]), 0.0);
        assert_eq!(red, BandData::U8(vec![1, 2, 3, 4, 0, 0]));
        assert_eq!(green, BandData::U8(vec![10, 20, 30, 40, 0, 0]));

        assert_eq!(mapping.source_index(0, 0), Some(0));
        assert_eq!(mapping.source_index(1, 1), Some(3));
        assert_eq!(mapping.source_index(0, 2), None);
    }
}
