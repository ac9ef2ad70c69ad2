//! Failure outcomes of a reprojection run

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::tiff::errors::TiffError;

/// The closed set of ways a single reprojection can fail
///
/// None of these are transient: replaying the same inputs reproduces the
/// same error, so callers never retry automatically.
#[derive(Debug)]
pub enum ReprojectError {
    /// Input file is larger than the configured ceiling
    InputTooLarge { size: u64, limit: u64 },
    /// EPSG code absent from the CRS database
    UnknownEpsg(u32),
    /// Malformed CRS descriptor or a definition that cannot be used
    InvalidCrs(String),
    /// Destination extent with zero area or otherwise unusable
    DegenerateExtent(String),
    /// Output format outside the supported set, or unable to hold the data
    UnsupportedFormat(String),
    /// Read or write failure (disk, permissions, corrupt source)
    Io(TiffError),
    /// Run aborted at a band boundary by an external cancellation request
    Cancelled { completed_bands: usize, total_bands: usize },
}

impl fmt::Display for ReprojectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReprojectError::InputTooLarge { size, limit } => {
                write!(f, "Input of {} bytes exceeds the {} byte limit", size, limit)
            },
            ReprojectError::UnknownEpsg(code) => write!(f, "Unknown EPSG code: {}", code),
            ReprojectError::InvalidCrs(msg) => write!(f, "Invalid CRS: {}", msg),
            ReprojectError::DegenerateExtent(msg) => write!(f, "Degenerate extent: {}", msg),
            ReprojectError::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
            ReprojectError::Io(e) => write!(f, "{}", e),
            ReprojectError::Cancelled { completed_bands, total_bands } => {
                write!(f, "Cancelled after {} of {} bands", completed_bands, total_bands)
            },
        }
    }
}

impl std::error::Error for ReprojectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReprojectError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TiffError> for ReprojectError {
    fn from(error: TiffError) -> Self {
        ReprojectError::Io(error)
    }
}

impl From<io::Error> for ReprojectError {
    fn from(error: io::Error) -> Self {
        ReprojectError::Io(TiffError::IoError(error))
    }
}

impl From<image::ImageError> for ReprojectError {
    fn from(error: image::ImageError) -> Self {
        match error {
            image::ImageError::IoError(e) => ReprojectError::Io(TiffError::IoError(e)),
            image::ImageError::Unsupported(e) => ReprojectError::UnsupportedFormat(e.to_string()),
            other => ReprojectError::Io(TiffError::GenericError(format!("Image encoding failed: {}", other))),
        }
    }
}

/// Result type for reprojection operations
pub type ReprojectResult<T> = Result<T, ReprojectError>;

/// Pipeline step that was running when a failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    SizeCheck,
    CrsResolution,
    OpenSource,
    Planning,
    Writing,
    WorldFile,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::SizeCheck => "size check",
            PipelineStage::CrsResolution => "CRS resolution",
            PipelineStage::OpenSource => "opening source",
            PipelineStage::Planning => "planning",
            PipelineStage::Writing => "writing",
            PipelineStage::WorldFile => "world file",
        };
        f.write_str(name)
    }
}

/// A failed run: what went wrong, where, and for which input
#[derive(Debug)]
pub struct PipelineFailure {
    pub stage: PipelineStage,
    pub input: PathBuf,
    pub error: ReprojectError,
}

impl PipelineFailure {
    pub fn new(stage: PipelineStage, input: &Path, error: ReprojectError) -> Self {
        PipelineFailure { stage, input: input.to_path_buf(), error }
    }

    /// The failure kind, for callers that branch on it
    pub fn kind(&self) -> &ReprojectError {
        &self.error
    }
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed for {}: {}", self.stage, self.input.display(), self.error)
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
