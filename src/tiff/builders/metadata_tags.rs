//! GDAL metadata tag strategies

use log::debug;

use crate::tiff::builder::TiffBuilder;
use crate::tiff::constants::tags;

/// Adds GDAL private tags to a builder
pub struct MetadataBuilder;

impl MetadataBuilder {
    /// Format a nodata value the way GDAL_NODATA stores it
    pub fn format_nodata(value: f64) -> String {
        if value.is_nan() {
            "nan".to_string()
        } else if value.fract() == 0.0 && value.abs() < 1e15 {
            format!("{}", value as i64)
        } else {
            format!("{}", value)
        }
    }

    /// Add GDAL_NODATA
    pub fn add_nodata_tag(builder: &mut TiffBuilder, value: f64) {
        let text = Self::format_nodata(value);
        debug!("Adding GDAL_NODATA tag: {}", text);
        builder.add_ascii(tags::GDAL_NODATA, &text);
    }
}
