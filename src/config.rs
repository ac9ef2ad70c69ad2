//! Runtime configuration
//!
//! Values come from built-in defaults, optionally overridden by a TOML
//! file. Keys the file does not mention keep their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::reproject::planner::DEFAULT_BOUNDARY_SAMPLES;
use crate::tiff::errors::{TiffError, TiffResult};

/// Largest accepted input, 1 GiB
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 1_073_741_824;

/// Settings passed to the reprojection pipeline at construction
#[derive(Debug, Clone, PartialEq)]
pub struct ReprojectConfig {
    /// Inputs larger than this are rejected before they are opened
    pub max_input_bytes: u64,
    /// Where uploaded blobs are staged
    pub upload_dir: PathBuf,
    /// Where produced rasters, world files and archives live
    pub output_dir: PathBuf,
    /// Boundary points per edge used when planning the destination extent
    pub boundary_samples: usize,
    /// Strip compression for GeoTIFF outputs
    pub tiff_compression: String,
}

impl Default for ReprojectConfig {
    fn default() -> Self {
        ReprojectConfig {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("processed"),
            boundary_samples: DEFAULT_BOUNDARY_SAMPLES,
            tiff_compression: "none".to_string(),
        }
    }
}

impl ReprojectConfig {
    /// Parse a TOML document on top of the defaults
    pub fn from_toml_str(content: &str) -> TiffResult<Self> {
        let value: toml::Value = content.parse()
            .map_err(|e| TiffError::GenericError(format!("Failed to parse TOML: {}", e)))?;
        let mut config = ReprojectConfig::default();

        if let Some(v) = value.get("max_input_bytes") {
            let bytes = v.as_integer()
                .filter(|&n| n > 0)
                .ok_or_else(|| Self::wrong_type("max_input_bytes", "a positive integer"))?;
            config.max_input_bytes = bytes as u64;
        }
        if let Some(v) = value.get("upload_dir") {
            config.upload_dir = PathBuf::from(v.as_str().ok_or_else(|| Self::wrong_type("upload_dir", "a string"))?);
        }
        if let Some(v) = value.get("output_dir") {
            config.output_dir = PathBuf::from(v.as_str().ok_or_else(|| Self::wrong_type("output_dir", "a string"))?);
        }
        if let Some(v) = value.get("boundary_samples") {
            let samples = v.as_integer()
                .filter(|&n| n >= 2)
                .ok_or_else(|| Self::wrong_type("boundary_samples", "an integer of at least 2"))?;
            config.boundary_samples = samples as usize;
        }
        if let Some(v) = value.get("tiff_compression") {
            config.tiff_compression = v.as_str()
                .ok_or_else(|| Self::wrong_type("tiff_compression", "a string"))?
                .to_string();
        }

        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Load a TOML file on top of the defaults
    pub fn load(path: &Path) -> TiffResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn wrong_type(key: &str, expected: &str) -> TiffError {
        TiffError::GenericError(format!("Configuration key '{}' must be {}", key, expected))
    }
}
