//! TIFF builder strategy modules
//!
//! Tag groups the `TiffBuilder` is filled with, plus the file writer.

pub mod basic_tags;
pub mod geo_tags;
pub mod metadata_tags;
pub mod writer;

pub use basic_tags::{BasicTagsBuilder, ImageStructure};
pub use geo_tags::{GeoKeyCrs, GeoTagsBuilder};
pub use metadata_tags::MetadataBuilder;
