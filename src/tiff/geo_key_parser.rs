//! GeoTIFF Metadata and GeoKey parsing functionality
//!
//! Interprets the GeoKey directory, the model transform tags and GDAL's
//! nodata tag of a single IFD into a `GeoReference`.

use log::{debug, warn};

use crate::coordinate::AffineTransform;
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{geo_keys, model_type, raster_type, tags, USER_DEFINED};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;

/// One key from the GeoKey directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeyEntry {
    pub key_id: u16,
    /// 0 for inline values, otherwise the params tag holding the value
    pub tiff_tag_location: u16,
    pub count: u16,
    pub value_offset: u16,
}

impl GeoKeyEntry {
    pub fn new(key_id: u16, tiff_tag_location: u16, count: u16, value_offset: u16) -> Self {
        GeoKeyEntry { key_id, tiff_tag_location, count, value_offset }
    }

    /// The inline SHORT value, if the key stores one
    pub fn inline_value(&self) -> Option<u16> {
        if self.tiff_tag_location == 0 { Some(self.value_offset) } else { None }
    }
}

/// Geolocation of a raster as recorded in its GeoTIFF tags
#[derive(Debug, Clone, PartialEq)]
pub struct GeoReference {
    /// EPSG code from ProjectedCSTypeGeoKey or GeographicTypeGeoKey
    pub epsg_code: Option<u32>,
    /// Free-text CRS citation, used when no EPSG code is recorded
    pub citation: Option<String>,
    /// Pixel-to-map transform, already shifted to pixel-corner convention
    pub transform: Option<AffineTransform>,
    /// GDAL nodata value
    pub nodata: Option<f64>,
    /// Value of GTRasterTypeGeoKey (PixelIsArea when absent)
    pub raster_type: u16,
}

impl GeoReference {
    /// The CRS descriptor this raster declares, if any
    pub fn crs_descriptor(&self) -> Option<String> {
        match (self.epsg_code, &self.citation) {
            (Some(code), _) => Some(format!("EPSG:{}", code)),
            (None, Some(citation)) => Some(citation.clone()),
            (None, None) => None,
        }
    }
}

/// Parser for GeoTIFF geographic metadata
pub struct GeoKeyParser;

impl GeoKeyParser {
    /// Parse the GeoKey directory from an IFD
    ///
    /// Returns an empty list when the IFD has no GeoKeyDirectoryTag.
    pub fn parse_geo_key_directory(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
    ) -> TiffResult<Vec<GeoKeyEntry>> {
        if !ifd.has_tag(tags::GEO_KEY_DIRECTORY_TAG) {
            return Ok(Vec::new());
        }

        let values = tiff_reader.read_tag_values(reader, ifd, tags::GEO_KEY_DIRECTORY_TAG)?;
        if values.len() < 4 {
            return Err(TiffError::CorruptData("GeoKey directory shorter than its header".to_string()));
        }

        // Header: KeyDirectoryVersion, KeyRevision, MinorRevision, NumberOfKeys
        let num_keys = values[3] as usize;
        debug!("GeoKey directory: version={}, revision={}.{}, keys={}",
               values[0], values[1], values[2], num_keys);

        let available = (values.len() - 4) / 4;
        if num_keys > available {
            warn!("GeoKey directory declares {} keys but holds {}", num_keys, available);
        }

        let keys = values[4..].chunks_exact(4)
            .take(num_keys.min(available))
            .map(|k| GeoKeyEntry::new(k[0] as u16, k[1] as u16, k[2] as u16, k[3] as u16))
            .collect();

        Ok(keys)
    }

    /// Read the ASCII value of a key stored in GeoAsciiParamsTag
    fn ascii_key_value(ascii_params: &str, key: &GeoKeyEntry) -> Option<String> {
        if key.tiff_tag_location != tags::GEO_ASCII_PARAMS_TAG {
            return None;
        }
        let start = key.value_offset as usize;
        let end = start + key.count as usize;
        let value = ascii_params.get(start..end)?
            .trim_end_matches(|c| c == '|' || c == '\0')
            .trim();

        if value.is_empty() { None } else { Some(value.to_string()) }
    }

    /// Read the pixel-to-map transform
    ///
    /// ModelTransformationTag wins over ModelPixelScale + ModelTiepoint.
    /// Returns `None` for rasters without either.
    pub fn read_transform(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
    ) -> TiffResult<Option<AffineTransform>> {
        if ifd.has_tag(tags::MODEL_TRANSFORMATION_TAG) {
            let m = tiff_reader.read_tag_doubles(reader, ifd, tags::MODEL_TRANSFORMATION_TAG)?;
            if m.len() < 16 {
                return Err(TiffError::CorruptData(format!(
                    "ModelTransformationTag holds {} values, expected 16", m.len()
                )));
            }
            return Ok(Some(AffineTransform::new(m[0], m[1], m[3], m[4], m[5], m[7])));
        }

        if !ifd.has_tag(tags::MODEL_PIXEL_SCALE_TAG) || !ifd.has_tag(tags::MODEL_TIEPOINT_TAG) {
            return Ok(None);
        }

        let scale = tiff_reader.read_tag_doubles(reader, ifd, tags::MODEL_PIXEL_SCALE_TAG)?;
        let tiepoint = tiff_reader.read_tag_doubles(reader, ifd, tags::MODEL_TIEPOINT_TAG)?;
        if scale.len() < 2 || tiepoint.len() < 6 {
            return Err(TiffError::CorruptData("Incomplete pixel scale or tiepoint".to_string()));
        }

        // Tiepoint (i, j, k) -> (x, y, z); rows run southwards
        let (sx, sy) = (scale[0], scale[1]);
        let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
        Ok(Some(AffineTransform::new(sx, 0.0, x - i * sx, 0.0, -sy, y + j * sy)))
    }

    /// Read GDAL_NODATA, if present and numeric
    pub fn read_nodata(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
    ) -> TiffResult<Option<f64>> {
        if !ifd.has_tag(tags::GDAL_NODATA) {
            return Ok(None);
        }

        let text = tiff_reader.read_tag_ascii(reader, ifd, tags::GDAL_NODATA)?;
        match text.trim().parse::<f64>() {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                warn!("Ignoring non-numeric GDAL_NODATA value '{}'", text.trim());
                Ok(None)
            }
        }
    }

    /// Extract the full geolocation of an IFD
    pub fn extract_geo_reference(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
    ) -> TiffResult<GeoReference> {
        let keys = Self::parse_geo_key_directory(tiff_reader, reader, ifd)?;

        let ascii_params = if ifd.has_tag(tags::GEO_ASCII_PARAMS_TAG) {
            tiff_reader.read_tag_ascii(reader, ifd, tags::GEO_ASCII_PARAMS_TAG)?
        } else {
            String::new()
        };

        let mut model = None;
        let mut projected = None;
        let mut geographic = None;
        let mut citations: [Option<String>; 3] = [None, None, None];
        let mut raster = raster_type::PIXEL_IS_AREA;

        for key in &keys {
            match key.key_id {
                geo_keys::GT_MODEL_TYPE => model = key.inline_value(),
                geo_keys::PROJECTED_CS_TYPE => projected = key.inline_value(),
                geo_keys::GEOGRAPHIC_TYPE => geographic = key.inline_value(),
                geo_keys::GT_RASTER_TYPE => raster = key.inline_value().unwrap_or(raster),
                geo_keys::PROJ_CITATION => citations[0] = Self::ascii_key_value(&ascii_params, key),
                geo_keys::GT_CITATION => citations[1] = Self::ascii_key_value(&ascii_params, key),
                geo_keys::GEOG_CITATION => citations[2] = Self::ascii_key_value(&ascii_params, key),
                _ => {}
            }
        }

        let is_projected = match model {
            Some(model_type::PROJECTED) => true,
            Some(model_type::GEOGRAPHIC) => false,
            _ => projected.is_some(),
        };
        let usable = |code: Option<u16>| code.filter(|&c| c != 0 && c != USER_DEFINED);
        let epsg_code = (if is_projected { usable(projected) } else { usable(geographic) }).map(u32::from);
        // The geographic citation only names the datum of a projected model
        let citation_keys = if is_projected { 2 } else { 3 };
        let citation = citations.into_iter().take(citation_keys).flatten().next();

        let mut transform = Self::read_transform(tiff_reader, reader, ifd)?;
        if raster == raster_type::PIXEL_IS_POINT {
            // Tie the outer corner of the first pixel, not its centre
            transform = transform.map(|t| {
                AffineTransform::new(t.a, t.b, t.c - 0.5 * (t.a + t.b), t.d, t.e, t.f - 0.5 * (t.d + t.e))
            });
        }

        let nodata = Self::read_nodata(tiff_reader, reader, ifd)?;

        debug!("GeoReference: epsg={:?}, citation={:?}, transform={:?}, nodata={:?}",
               epsg_code, citation, transform, nodata);

        Ok(GeoReference { epsg_code, citation, transform, nodata, raster_type: raster })
    }
}
