//! Raster I/O
//!
//! Reading GeoTIFF sources band by band and writing destination rasters
//! in any of the supported output formats.

pub mod band_reader;
pub mod sample;
pub mod sink;
pub mod source;

use std::path::Path;

use crate::reproject::errors::ReprojectResult;
use crate::reproject::format::OutputFormat;
use crate::tiff::errors::TiffResult;

pub use band_reader::BandReader;
pub use sample::{BandData, Sample, SampleType};
pub use sink::{RasterSink, SinkMetadata};
pub use source::{CrsDescriptor, RasterSource};

/// Opens sources and creates sinks on behalf of the reprojection pipeline
pub trait RasterIo {
    /// Opens a raster for reading
    fn open(&self, path: &Path) -> TiffResult<RasterSource>;

    /// Allocates a destination raster with its final metadata
    fn create(&self, path: &Path, metadata: SinkMetadata, format: OutputFormat) -> ReprojectResult<RasterSink> {
        RasterSink::create(path, metadata, format)
    }
}

/// File-backed GeoTIFF reader
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffIo;

impl RasterIo for GeoTiffIo {
    fn open(&self, path: &Path) -> TiffResult<RasterSource> {
        RasterSource::open(path)
    }
}
