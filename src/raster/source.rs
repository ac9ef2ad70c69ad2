//! Read-only raster sources
//!
//! A `RasterSource` is either backed by a GeoTIFF on disk, decoding bands
//! lazily as they are requested, or by bands already held in memory.

use std::fmt;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, info};

use crate::coordinate::{AffineTransform, BoundingBox, Crs, CrsResolver};
use crate::reproject::errors::{ReprojectError, ReprojectResult};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::geo_key_parser::GeoKeyParser;
use crate::tiff::reader::TiffReader;

use super::band_reader::BandReader;
use super::sample::{BandData, SampleType};

/// The CRS a raster declares, before it has been resolved
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CrsDescriptor {
    pub epsg: Option<u32>,
    pub citation: Option<String>,
}

impl CrsDescriptor {
    pub fn from_epsg(code: u32) -> Self {
        CrsDescriptor { epsg: Some(code), citation: None }
    }

    /// Resolves the descriptor, preferring the EPSG code over the citation
    pub fn resolve(&self) -> ReprojectResult<Crs> {
        match (self.epsg, &self.citation) {
            (Some(code), _) => CrsResolver::resolve_epsg(code),
            (None, Some(citation)) => CrsResolver::resolve(citation),
            (None, None) => Err(ReprojectError::InvalidCrs("source raster declares no CRS".to_string())),
        }
    }
}

impl fmt::Display for CrsDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.epsg, &self.citation) {
            (Some(code), _) => write!(f, "EPSG:{}", code),
            (None, Some(citation)) => f.write_str(citation),
            (None, None) => f.write_str("unknown"),
        }
    }
}

enum Bands {
    File {
        reader: Mutex<BufReader<File>>,
        decoder: BandReader,
    },
    Memory(Vec<BandData>),
}

/// Immutable handle to an input raster
pub struct RasterSource {
    path: Option<PathBuf>,
    width: usize,
    height: usize,
    band_count: usize,
    sample_type: SampleType,
    crs: CrsDescriptor,
    transform: AffineTransform,
    byte_size: u64,
    nodata: Option<f64>,
    bands: Bands,
}

impl RasterSource {
    /// Opens a GeoTIFF, reading its metadata but no pixel data
    pub fn open(path: &Path) -> TiffResult<Self> {
        info!("Opening raster {}", path.display());
        let byte_size = fs::metadata(path)?.len();
        let mut reader = BufReader::with_capacity(1024 * 1024, File::open(path)?);

        let mut tiff_reader = TiffReader::new();
        let tiff = tiff_reader.read(&mut reader)?;
        let ifd = tiff.primary_image().ok_or(TiffError::InvalidHeader)?;

        let decoder = BandReader::new(&tiff_reader, &mut reader, ifd, tiff.byte_order)?;
        let geo = GeoKeyParser::extract_geo_reference(&tiff_reader, &mut reader, ifd)?;

        let transform = geo.transform.ok_or_else(|| TiffError::GenericError(
            "Raster carries no georeferencing (ModelTiepoint or ModelTransformation)".to_string()
        ))?;
        if !transform.is_valid() {
            return Err(TiffError::CorruptData(format!("Degenerate pixel transform {}", transform)));
        }

        let source = RasterSource {
            path: Some(path.to_path_buf()),
            width: decoder.width(),
            height: decoder.height(),
            band_count: decoder.band_count(),
            sample_type: decoder.sample_type(),
            crs: CrsDescriptor { epsg: geo.epsg_code, citation: geo.citation },
            transform,
            byte_size,
            nodata: geo.nodata,
            bands: Bands::File { reader: Mutex::new(reader), decoder },
        };

        debug!("Opened {}", source);
        Ok(source)
    }

    /// Builds a source from bands already in memory
    ///
    /// All bands must share one sample type and hold `width * height` samples.
    pub fn from_bands(
        width: usize,
        height: usize,
        crs: CrsDescriptor,
        transform: AffineTransform,
        bands: Vec<BandData>,
        nodata: Option<f64>,
    ) -> TiffResult<Self> {
        let first = bands.first()
            .ok_or_else(|| TiffError::GenericError("A raster needs at least one band".to_string()))?;
        let sample_type = first.sample_type();

        for (i, band) in bands.iter().enumerate() {
            if band.sample_type() != sample_type || band.len() != width * height {
                return Err(TiffError::CorruptData(format!(
                    "Band {} holds {} {} samples, expected {} {} samples",
                    i + 1, band.len(), band.sample_type(), width * height, sample_type
                )));
            }
        }

        Ok(RasterSource {
            path: None,
            width,
            height,
            band_count: bands.len(),
            sample_type,
            crs,
            transform,
            byte_size: bands.iter().map(BandData::byte_len).sum(),
            nodata,
            bands: Bands::Memory(bands),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    pub fn crs(&self) -> &CrsDescriptor {
        &self.crs
    }

    pub fn transform(&self) -> &AffineTransform {
        &self.transform
    }

    /// Size on disk, or of the in-memory samples
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    /// Map-space extent covered by the raster
    pub fn bounds(&self) -> BoundingBox {
        self.transform.bounds(self.width, self.height)
    }

    /// Reads band `index`, counting from 1
    pub fn read_band(&self, index: usize) -> TiffResult<BandData> {
        if index == 0 || index > self.band_count {
            return Err(TiffError::GenericError(format!(
                "Band {} out of range 1..={}", index, self.band_count
            )));
        }

        match &self.bands {
            Bands::Memory(bands) => Ok(bands[index - 1].clone()),
            Bands::File { reader, decoder } => {
                let mut reader = reader.lock()
                    .map_err(|_| TiffError::GenericError("Raster reader lock poisoned".to_string()))?;
                decoder.read_band(&mut *reader, index - 1)
            },
        }
    }
}

impl fmt::Display for RasterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} raster, {} band(s) of {}, CRS {}, transform {}",
               self.width, self.height, self.band_count, self.sample_type, self.crs, self.transform)
    }
}
