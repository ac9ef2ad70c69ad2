//! Reprojection of rasters into a target CRS
//!
//! The pipeline plans a destination grid, resamples every band onto it
//! with nearest-neighbour lookup, writes the result in the requested
//! format and, where the format cannot carry georeferencing, a world file.

pub mod errors;
pub mod format;
pub mod pipeline;
pub mod planner;
pub mod progress;
pub mod resampler;
pub mod world_file;

pub use errors::{PipelineFailure, PipelineStage, ReprojectError, ReprojectResult};
pub use format::{FormatFamily, OutputFormat};
pub use pipeline::{PipelineState, ReprojectRequest, ReprojectionOutcome, Reprojector};
pub use planner::{DestinationPlan, TransformPlanner};
pub use progress::{CancellationToken, NoProgress, ProgressEvent, ProgressListener};
pub use resampler::{resample_band, PixelMapping};
pub use world_file::{emit, parse_world_file, WorldFileOutcome};
