//! Basic TIFF tag strategies
//!
//! Dimensions, sample layout, photometric interpretation and compression
//! of the image being written.

use log::debug;

use crate::tiff::builder::TiffBuilder;
use crate::tiff::constants::{extra_samples, photometric, planar_config, sample_format, tags};

/// Pixel layout of an image about to be written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageStructure {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u16,
    pub bits_per_sample: u16,
    /// SampleFormat tag value
    pub sample_format: u16,
    /// Compression tag value
    pub compression: u16,
}

impl ImageStructure {
    /// RGB for three or more 8-bit unsigned bands, greyscale otherwise
    pub fn photometric(&self) -> u16 {
        if self.samples_per_pixel >= 3 && self.bits_per_sample == 8 && self.sample_format == sample_format::UNSIGNED {
            photometric::RGB
        } else {
            photometric::BLACK_IS_ZERO
        }
    }

    /// Number of samples beyond those the photometric interpretation names
    pub fn extra_sample_count(&self) -> u16 {
        let base = if self.photometric() == photometric::RGB { 3 } else { 1 };
        self.samples_per_pixel.saturating_sub(base)
    }

    /// Bytes in one uncompressed row of interleaved samples
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.samples_per_pixel as usize * (self.bits_per_sample as usize / 8)
    }
}

/// Adds basic TIFF tags to a builder
pub struct BasicTagsBuilder;

impl BasicTagsBuilder {
    /// Add the tags describing `structure`, stored chunky
    pub fn add_image_structure(builder: &mut TiffBuilder, structure: &ImageStructure) {
        debug!("Adding image structure: {:?}", structure);
        let spp = structure.samples_per_pixel as usize;

        builder.add_long(tags::IMAGE_WIDTH, structure.width);
        builder.add_long(tags::IMAGE_LENGTH, structure.height);
        builder.add_shorts(tags::BITS_PER_SAMPLE, &vec![structure.bits_per_sample; spp]);
        builder.add_short(tags::COMPRESSION, structure.compression);
        builder.add_short(tags::PHOTOMETRIC_INTERPRETATION, structure.photometric());
        builder.add_short(tags::SAMPLES_PER_PIXEL, structure.samples_per_pixel);
        builder.add_short(tags::PLANAR_CONFIGURATION, planar_config::CHUNKY);
        builder.add_shorts(tags::SAMPLE_FORMAT, &vec![structure.sample_format; spp]);

        let extra = structure.extra_sample_count() as usize;
        if extra > 0 {
            builder.add_shorts(tags::EXTRA_SAMPLES, &vec![extra_samples::UNSPECIFIED; extra]);
        }
    }

    /// Record the producing software
    pub fn add_software(builder: &mut TiffBuilder) {
        builder.add_ascii(tags::SOFTWARE, concat!("georeproject ", env!("CARGO_PKG_VERSION")));
    }
}
