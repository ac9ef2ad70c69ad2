//! Destination rasters
//!
//! A `RasterSink` fixes all metadata when it is created, collects bands
//! in any order and encodes them on `finalize`. Encoding goes to
//! `<path>.partial`, which is renamed onto `path` only once it is complete;
//! a sink that is dropped unfinalised removes its partial file.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageBuffer};
use log::{debug, info, warn};

use crate::compression::CompressionFactory;
use crate::coordinate::{AffineTransform, Crs};
use crate::reproject::errors::{ReprojectError, ReprojectResult};
use crate::reproject::format::{FormatFamily, OutputFormat};
use crate::tiff::builder::TiffBuilder;
use crate::tiff::builders::{BasicTagsBuilder, GeoKeyCrs, GeoTagsBuilder, ImageStructure, MetadataBuilder};
use crate::tiff::errors::TiffError;

use super::sample::{interleave_le, BandData, SampleType};

/// Uncompressed size aimed for when cutting GeoTIFF strips
const STRIP_TARGET_BYTES: usize = 256 * 1024;

/// Headroom kept below the classic TIFF offset limit for tags and IFD
const CLASSIC_TIFF_HEADROOM: u64 = 1 << 20;

/// JPEG quality used for jpg/jpeg outputs
const JPEG_QUALITY: u8 = 90;

/// Everything about a destination raster except its pixels
#[derive(Debug, Clone)]
pub struct SinkMetadata {
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    pub sample_type: SampleType,
    pub crs: Crs,
    pub transform: AffineTransform,
    pub nodata: Option<f64>,
    /// GeoTIFF strip compression: none, deflate or zstd
    pub compression: String,
}

impl SinkMetadata {
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// A destination raster under construction
#[derive(Debug)]
pub struct RasterSink {
    path: PathBuf,
    partial: PathBuf,
    metadata: SinkMetadata,
    format: OutputFormat,
    bands: Vec<Option<BandData>>,
    finalized: bool,
}

impl RasterSink {
    /// Allocates a sink, checking that `format` can hold the bands described
    pub fn create(path: &Path, metadata: SinkMetadata, format: OutputFormat) -> ReprojectResult<Self> {
        Self::check_encodable(&metadata, format)?;

        let mut partial = OsString::from(path.as_os_str());
        partial.push(".partial");
        let partial = PathBuf::from(partial);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        File::create(&partial)?;

        info!("Allocated {}x{} {} sink with {} band(s) of {} at {}",
              metadata.width, metadata.height, format, metadata.band_count, metadata.sample_type, path.display());

        Ok(RasterSink {
            path: path.to_path_buf(),
            partial,
            bands: vec![None; metadata.band_count],
            metadata,
            format,
            finalized: false,
        })
    }

    fn check_encodable(metadata: &SinkMetadata, format: OutputFormat) -> ReprojectResult<()> {
        let unsupported = || ReprojectError::UnsupportedFormat(format!(
            "{} cannot hold {} band(s) of {}", format, metadata.band_count, metadata.sample_type
        ));

        if metadata.width == 0 || metadata.height == 0 || metadata.band_count == 0 {
            return Err(ReprojectError::DegenerateExtent(format!(
                "{}x{} raster with {} band(s)", metadata.width, metadata.height, metadata.band_count
            )));
        }
        if u32::try_from(metadata.width).is_err() || u32::try_from(metadata.height).is_err() {
            return Err(ReprojectError::UnsupportedFormat(format!(
                "{}x{} pixels exceed the {} size limit", metadata.width, metadata.height, format
            )));
        }

        match format.family() {
            FormatFamily::Tiff => {
                if u16::try_from(metadata.band_count).is_err() {
                    return Err(unsupported());
                }
                CompressionFactory::get_handler_by_name(&metadata.compression).map_err(|_| {
                    ReprojectError::UnsupportedFormat(format!("TIFF compression '{}'", metadata.compression))
                })?;
            },
            FormatFamily::Jpeg => {
                if metadata.sample_type != SampleType::U8 || metadata.band_count > 4 {
                    return Err(unsupported());
                }
            },
            FormatFamily::Png => {
                let depth_ok = matches!(metadata.sample_type, SampleType::U8 | SampleType::U16);
                if !depth_ok || metadata.band_count > 4 {
                    return Err(unsupported());
                }
            },
        }

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &SinkMetadata {
        &self.metadata
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Stores band `index`, counting from 1
    pub fn write_band(&mut self, index: usize, data: BandData) -> ReprojectResult<()> {
        if index == 0 || index > self.metadata.band_count {
            return Err(TiffError::GenericError(format!(
                "Band {} out of range 1..={}", index, self.metadata.band_count
            )).into());
        }
        if data.sample_type() != self.metadata.sample_type || data.len() != self.metadata.pixel_count() {
            return Err(TiffError::CorruptData(format!(
                "Band {} holds {} {} samples, sink expects {} {} samples",
                index, data.len(), data.sample_type(), self.metadata.pixel_count(), self.metadata.sample_type
            )).into());
        }

        let slot = &mut self.bands[index - 1];
        if slot.is_some() {
            return Err(TiffError::GenericError(format!("Band {} written twice", index)).into());
        }

        debug!("Band {} stored in sink for {}", index, self.path.display());
        *slot = Some(data);
        Ok(())
    }

    /// Encodes all bands and moves the result onto the final path
    pub fn finalize(mut self) -> ReprojectResult<PathBuf> {
        let mut bands = Vec::with_capacity(self.bands.len());
        for (i, band) in self.bands.iter().enumerate() {
            let band = band.as_ref().ok_or_else(|| {
                TiffError::GenericError(format!("Band {} was never written", i + 1))
            })?;
            bands.push(band);
        }

        match self.format.family() {
            FormatFamily::Tiff => self.encode_tiff(&bands)?,
            FormatFamily::Jpeg => self.encode_jpeg(&bands)?,
            FormatFamily::Png => self.encode_png(&bands)?,
        }

        fs::rename(&self.partial, &self.path)?;
        self.finalized = true;
        info!("Finalized {}", self.path.display());
        Ok(self.path.clone())
    }

    fn encode_tiff(&self, bands: &[&BandData]) -> ReprojectResult<()> {
        let meta = &self.metadata;
        let compressor = CompressionFactory::get_handler_by_name(&meta.compression)?;

        let structure = ImageStructure {
            width: meta.width as u32,
            height: meta.height as u32,
            samples_per_pixel: meta.band_count as u16,
            bits_per_sample: meta.sample_type.bits(),
            sample_format: meta.sample_type.sample_format(),
            compression: compressor.code() as u16,
        };

        let rows_per_strip = (STRIP_TARGET_BYTES / structure.row_bytes().max(1)).clamp(1, meta.height);
        let mut strips = Vec::with_capacity(meta.height.div_ceil(rows_per_strip));
        for first_row in (0..meta.height).step_by(rows_per_strip) {
            let last_row = (first_row + rows_per_strip).min(meta.height);
            let raw = interleave_le(bands, first_row * meta.width..last_row * meta.width);
            strips.push(compressor.compress(&raw)?);
        }

        let payload: u64 = strips.iter().map(|s| s.len() as u64).sum();
        let is_big_tiff = payload > u32::MAX as u64 - CLASSIC_TIFF_HEADROOM;
        if is_big_tiff {
            info!("Payload of {} bytes needs BigTIFF", payload);
        }

        let mut builder = TiffBuilder::new(is_big_tiff);
        BasicTagsBuilder::add_image_structure(&mut builder, &structure);
        BasicTagsBuilder::add_software(&mut builder);
        GeoTagsBuilder::add_transform(&mut builder, &meta.transform);
        GeoTagsBuilder::add_geo_keys(&mut builder, &GeoKeyCrs {
            epsg_code: meta.crs.epsg_code(),
            is_geographic: meta.crs.is_geographic(),
            citation: meta.crs.description(),
        });
        if let Some(nodata) = meta.nodata {
            MetadataBuilder::add_nodata_tag(&mut builder, nodata);
        }
        builder.set_strips(strips, rows_per_strip as u32);

        builder.write(&self.partial)?;
        Ok(())
    }

    fn encode_jpeg(&self, bands: &[&BandData]) -> ReprojectResult<()> {
        let channels = match bands.len() {
            1 | 2 => 1,
            _ => 3,
        };
        if bands.len() != channels {
            warn!("JPEG has no alpha channel, dropping band {}", bands.len());
        }

        let image = self.dynamic_image(&bands[..channels])?;
        let mut writer = BufWriter::new(File::create(&self.partial)?);
        image.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY))?;
        writer.flush()?;
        Ok(())
    }

    fn encode_png(&self, bands: &[&BandData]) -> ReprojectResult<()> {
        let image = self.dynamic_image(bands)?;
        let mut writer = BufWriter::new(File::create(&self.partial)?);
        image.write_with_encoder(PngEncoder::new(&mut writer))?;
        writer.flush()?;
        Ok(())
    }

    /// Interleaves 1 to 4 u8 or u16 bands into an `image` buffer
    fn dynamic_image(&self, bands: &[&BandData]) -> ReprojectResult<DynamicImage> {
        let (width, height) = (self.metadata.width as u32, self.metadata.height as u32);
        let malformed = || ReprojectError::UnsupportedFormat(format!(
            "{} cannot hold {} band(s) of {}", self.format, bands.len(), self.metadata.sample_type
        ));

        if let Some(planes) = bands.iter().map(|b| b.as_u8()).collect::<Option<Vec<_>>>() {
            let pixels = interleave(&planes);
            let image = match planes.len() {
                1 => ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
                2 => ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageLumaA8),
                3 => ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
                4 => ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8),
                _ => None,
            };
            return image.ok_or_else(malformed);
        }

        if let Some(planes) = bands.iter().map(|b| b.as_u16()).collect::<Option<Vec<_>>>() {
            let pixels = interleave(&planes);
            let image = match planes.len() {
                1 => ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageLuma16),
                2 => ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageLumaA16),
                3 => ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageRgb16),
                4 => ImageBuffer::from_raw(width, height, pixels).map(DynamicImage::ImageRgba16),
                _ => None,
            };
            return image.ok_or_else(malformed);
        }

        Err(malformed())
    }
}

impl Drop for RasterSink {
    fn drop(&mut self) {
        if !self.finalized && self.partial.exists() {
            match fs::remove_file(&self.partial) {
                Ok(()) => debug!("Discarded unfinished {}", self.partial.display()),
                Err(e) => warn!("Could not remove {}: {}", self.partial.display(), e),
            }
        }
    }
}

/// Pixel-interleaves equally sized planes
fn interleave<T: Copy>(planes: &[&[T]]) -> Vec<T> {
    let len = planes.first().map_or(0, |p| p.len());
    let mut out = Vec::with_capacity(len * planes.len());
    for i in 0..len {
        for plane in planes {
            out.push(plane[i]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::CrsResolver;

    fn metadata(band_count: usize, sample_type: SampleType) -> SinkMetadata {
        SinkMetadata {
            width: 2,
            height: 2,
            band_count,
            sample_type,
            crs: CrsResolver::resolve_epsg(3857).unwrap(),
            transform: AffineTransform::from_origin(0.0, 20.0, 10.0, 10.0),
            nodata: Some(0.0),
            compression: "none".to_string(),
        }
    }

    fn format(name: &str) -> OutputFormat {
        name.parse().unwrap()
    }

    #[test]
    fn test_rejects_unencodable_combinations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");

        let err = RasterSink::create(&path, metadata(1, SampleType::U16), format("jpg")).unwrap_err();
        assert!(matches!(err, ReprojectError::UnsupportedFormat(_)));
        assert!(RasterSink::create(&path, metadata(1, SampleType::F32), format("png")).is_err());
        assert!(RasterSink::create(&path, metadata(5, SampleType::U8), format("png")).is_err());

        let mut bad_compression = metadata(1, SampleType::U8);
        bad_compression.compression = "jpeg".to_string();
        assert!(RasterSink::create(&dir.path().join("out.tif"), bad_compression, format("tif")).is_err());

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_write_band_validation() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RasterSink::create(&dir.path().join("out.tif"), metadata(2, SampleType::U8), format("tif")).unwrap();

        assert!(sink.write_band(0, BandData::U8(vec![0; 4])).is_err());
        assert!(sink.write_band(3, BandData::U8(vec![0; 4])).is_err());
        assert!(sink.write_band(1, BandData::U16(vec![0; 4])).is_err());
        assert!(sink.write_band(1, BandData::U8(vec![0; 3])).is_err());

        sink.write_band(2, BandData::U8(vec![0; 4])).unwrap();
        assert!(sink.write_band(2, BandData::U8(vec![1; 4])).is_err());
    }

    #[test]
    fn test_drop_removes_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        {
            let mut sink = RasterSink::create(&path, metadata(1, SampleType::U8), format("png")).unwrap();
            sink.write_band(1, BandData::U8(vec![1, 2, 3, 4])).unwrap();
        }
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_finalize_requires_all_bands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tif");
        let mut sink = RasterSink::create(&path, metadata(2, SampleType::U8), format("tif")).unwrap();
        sink.write_band(1, BandData::U8(vec![1, 2, 3, 4])).unwrap();

        assert!(sink.finalize().is_err());
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_png_round_trip_u16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let mut sink = RasterSink::create(&path, metadata(1, SampleType::U16), format("png")).unwrap();
        sink.write_band(1, BandData::U16(vec![0, 1000, 40000, 65535])).unwrap();
        assert_eq!(sink.finalize().unwrap(), path);

        let decoded = image::open(&path).unwrap().into_luma16();
        assert_eq!(decoded.into_raw(), vec![0, 1000, 40000, 65535]);
    }

    #[test]
    fn test_jpeg_drops_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpeg");
        let mut sink = RasterSink::create(&path, metadata(4, SampleType::U8), format("jpeg")).unwrap();
        for band in 1..=4 {
            sink.write_band(band, BandData::U8(vec![200; 4])).unwrap();
        }
        sink.finalize().unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
        assert_eq!((decoded.width(), decoded.height()), (2, 2));
    }
}
