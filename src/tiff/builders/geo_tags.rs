//! GeoTIFF tag strategies
//!
//! Writes the model transform tags and a GeoKey directory naming the
//! CRS by EPSG code.

use log::{debug, warn};

use crate::coordinate::AffineTransform;
use crate::tiff::builder::TiffBuilder;
use crate::tiff::constants::{geo_keys, model_type, raster_type, tags, USER_DEFINED};

/// CRS identity as written into the GeoKey directory
#[derive(Debug, Clone, PartialEq)]
pub struct GeoKeyCrs {
    pub epsg_code: u32,
    pub is_geographic: bool,
    pub citation: String,
}

/// Adds GeoTIFF tags to a builder
pub struct GeoTagsBuilder;

impl GeoTagsBuilder {
    /// Write the pixel-to-map transform
    ///
    /// North-up transforms use ModelPixelScale + ModelTiepoint; rotated
    /// ones need the full ModelTransformation matrix.
    pub fn add_transform(builder: &mut TiffBuilder, transform: &AffineTransform) {
        if transform.is_north_up() && transform.a > 0.0 && transform.e < 0.0 {
            builder.add_doubles(tags::MODEL_PIXEL_SCALE_TAG, &[transform.a, -transform.e, 0.0]);
            builder.add_doubles(tags::MODEL_TIEPOINT_TAG, &[0.0, 0.0, 0.0, transform.c, transform.f, 0.0]);
        } else {
            let t = transform;
            builder.add_doubles(tags::MODEL_TRANSFORMATION_TAG, &[
                t.a, t.b, 0.0, t.c,
                t.d, t.e, 0.0, t.f,
                0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ]);
        }
    }

    /// Write GeoKeyDirectoryTag and GeoAsciiParamsTag for `crs`
    pub fn add_geo_keys(builder: &mut TiffBuilder, crs: &GeoKeyCrs) {
        let code = u16::try_from(crs.epsg_code).unwrap_or_else(|_| {
            warn!("EPSG:{} does not fit a GeoKey, writing it as user-defined", crs.epsg_code);
            USER_DEFINED
        });

        let ascii = format!("{}|", crs.citation);
        let (model, cs_key) = if crs.is_geographic {
            (model_type::GEOGRAPHIC, geo_keys::GEOGRAPHIC_TYPE)
        } else {
            (model_type::PROJECTED, geo_keys::PROJECTED_CS_TYPE)
        };

        // Keys in ascending id order: (id, location, count, value)
        let keys: [[u16; 4]; 4] = [
            [geo_keys::GT_MODEL_TYPE, 0, 1, model],
            [geo_keys::GT_RASTER_TYPE, 0, 1, raster_type::PIXEL_IS_AREA],
            [geo_keys::GT_CITATION, tags::GEO_ASCII_PARAMS_TAG, ascii.len() as u16, 0],
            [cs_key, 0, 1, code],
        ];

        let mut directory = vec![1, 1, 0, keys.len() as u16];
        directory.extend(keys.iter().flatten());
        debug!("Writing {} GeoKeys for EPSG:{}", keys.len(), crs.epsg_code);

        builder.add_shorts(tags::GEO_KEY_DIRECTORY_TAG, &directory);
        builder.add_ascii(tags::GEO_ASCII_PARAMS_TAG, &ascii);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_north_up_uses_scale_and_tiepoint() {
        let mut builder = TiffBuilder::new(false);
        GeoTagsBuilder::add_transform(&mut builder, &AffineTransform::from_origin(10.0, 20.0, 0.5, 0.25));
        assert!(builder.ifd.has_tag(tags::MODEL_PIXEL_SCALE_TAG));
        assert!(builder.ifd.has_tag(tags::MODEL_TIEPOINT_TAG));
        assert!(!builder.ifd.has_tag(tags::MODEL_TRANSFORMATION_TAG));
    }

    #[test]
    fn test_rotated_uses_matrix() {
        let mut builder = TiffBuilder::new(false);
        GeoTagsBuilder::add_transform(&mut builder, &AffineTransform::new(1.0, 0.2, 0.0, 0.1, -1.0, 0.0));
        assert!(builder.ifd.has_tag(tags::MODEL_TRANSFORMATION_TAG));
        assert_eq!(builder.external_data(tags::MODEL_TRANSFORMATION_TAG).map(|d| d.len()), Some(128));
    }

    #[test]
    fn test_geo_key_directory_layout() {
        let mut builder = TiffBuilder::new(false);
        let crs = GeoKeyCrs { epsg_code: 32633, is_geographic: false, citation: "EPSG:32633".to_string() };
        GeoTagsBuilder::add_geo_keys(&mut builder, &crs);

        let data = builder.external_data(tags::GEO_KEY_DIRECTORY_TAG).unwrap();
        let shorts: Vec<u16> = data.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
        assert_eq!(&shorts[..4], &[1, 1, 0, 4]);
        assert_eq!(&shorts[16..], &[geo_keys::PROJECTED_CS_TYPE, 0, 1, 32633]);
        assert_eq!(builder.external_data(tags::GEO_ASCII_PARAMS_TAG).unwrap(), b"EPSG:32633|\0");
    }
}
