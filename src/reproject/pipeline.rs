//! The reprojection pipeline
//!
//! `Reprojector::run` takes one input through size check, CRS resolution,
//! planning, band-by-band resampling into the sink and the optional world
//! file. Any failure stops the run, and the unfinished sink removes its
//! partial output when it is dropped.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info};

use crate::config::ReprojectConfig;
use crate::coordinate::CrsResolver;
use crate::raster::{GeoTiffIo, RasterIo, SampleType, SinkMetadata};

use super::errors::{PipelineFailure, PipelineStage, ReprojectError, ReprojectResult};
use super::format::OutputFormat;
use super::planner::{DestinationPlan, TransformPlanner};
use super::progress::{CancellationToken, NoProgress, ProgressEvent, ProgressListener};
use super::resampler::PixelMapping;
use super::world_file::{self, WorldFileOutcome};

/// States a run passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    SizeChecked,
    CrsResolved,
    Planned,
    Writing,
    WorldFileWritten,
    Complete,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One reprojection job
#[derive(Debug, Clone, PartialEq)]
pub struct ReprojectRequest {
    pub input: PathBuf,
    pub epsg_code: u32,
    pub format: OutputFormat,
    pub output: PathBuf,
}

impl ReprojectRequest {
    pub fn new(input: impl Into<PathBuf>, epsg_code: u32, format: OutputFormat, output: impl Into<PathBuf>) -> Self {
        ReprojectRequest { input: input.into(), epsg_code, format, output: output.into() }
    }
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct ReprojectionOutcome {
    pub primary: PathBuf,
    pub world_file: Option<PathBuf>,
    pub plan: DestinationPlan,
    pub band_count: usize,
    pub sample_type: SampleType,
    /// States visited, in order
    pub states: Vec<PipelineState>,
}

impl ReprojectionOutcome {
    /// Primary raster followed by the world file, if one was written
    pub fn artifacts(&self) -> Vec<&Path> {
        std::iter::once(self.primary.as_path())
            .chain(self.world_file.as_deref())
            .collect()
    }
}

struct StateTrail {
    input: PathBuf,
    states: Vec<PipelineState>,
}

impl StateTrail {
    fn new(input: &Path) -> Self {
        StateTrail { input: input.to_path_buf(), states: vec![PipelineState::Idle] }
    }

    fn advance(&mut self, state: PipelineState) {
        debug!("{}: {} -> {}", self.input.display(),
               self.states.last().copied().unwrap_or(PipelineState::Idle), state);
        self.states.push(state);
    }

    fn fail(&mut self, stage: PipelineStage, error: ReprojectError) -> PipelineFailure {
        self.advance(PipelineState::Failed);
        let failure = PipelineFailure::new(stage, &self.input, error);
        error!("{}", failure);
        failure
    }
}

/// Runs reprojections with a fixed configuration and raster I/O
pub struct Reprojector<I: RasterIo = GeoTiffIo> {
    config: ReprojectConfig,
    io: I,
    planner: TransformPlanner,
}

impl Reprojector<GeoTiffIo> {
    /// A reprojector reading GeoTIFFs from disk
    pub fn with_config(config: ReprojectConfig) -> Self {
        Reprojector::new(config, GeoTiffIo)
    }
}

impl<I: RasterIo> Reprojector<I> {
    pub fn new(config: ReprojectConfig, io: I) -> Self {
        let planner = TransformPlanner::new(config.boundary_samples);
        Reprojector { config, io, planner }
    }

    pub fn config(&self) -> &ReprojectConfig {
        &self.config
    }

    pub fn io(&self) -> &I {
        &self.io
    }

    /// Runs `request` without progress reporting or cancellation
    pub fn run(&self, request: &ReprojectRequest) -> Result<ReprojectionOutcome, PipelineFailure> {
        self.run_with(request, &NoProgress, &CancellationToken::new())
    }

    /// Runs `request`, reporting per-band progress and honouring `cancel`
    /// at every band boundary
    pub fn run_with(
        &self,
        request: &ReprojectRequest,
        progress: &dyn ProgressListener,
        cancel: &CancellationToken,
    ) -> Result<ReprojectionOutcome, PipelineFailure> {
        info!("Reprojecting {} to EPSG:{} as {}", request.input.display(), request.epsg_code, request.format);
        let mut trail = StateTrail::new(&request.input);

        self.check_size(&request.input)
            .map_err(|e| trail.fail(PipelineStage::SizeCheck, e))?;
        trail.advance(PipelineState::SizeChecked);

        let dest_crs = CrsResolver::resolve_epsg(request.epsg_code)
            .map_err(|e| trail.fail(PipelineStage::CrsResolution, e))?;

        let source = self.io.open(&request.input)
            .map_err(|e| trail.fail(PipelineStage::OpenSource, e.into()))?;
        debug!("Source: {}", source);

        let source_crs = source.crs().resolve()
            .map_err(|e| trail.fail(PipelineStage::CrsResolution, e))?;
        trail.advance(PipelineState::CrsResolved);

        let plan = self.planner
            .plan(&source_crs, &dest_crs, source.width(), source.height(), source.transform())
            .map_err(|e| trail.fail(PipelineStage::Planning, e))?;
        let mapping = PixelMapping::build(source.transform(), source.width(), source.height(), &source_crs, &plan)
            .map_err(|e| trail.fail(PipelineStage::Planning, e))?;
        trail.advance(PipelineState::Planned);

        let metadata = SinkMetadata {
            width: plan.width,
            height: plan.height,
            band_count: source.band_count(),
            sample_type: source.sample_type(),
            crs: plan.crs.clone(),
            transform: plan.transform,
            nodata: source.nodata(),
            compression: self.config.tiff_compression.clone(),
        };
        let mut sink = self.io.create(&request.output, metadata, request.format)
            .map_err(|e| trail.fail(PipelineStage::Writing, e))?;
        trail.advance(PipelineState::Writing);

        let total = source.band_count();
        let nodata = source.nodata().unwrap_or(0.0);
        for index in 1..=total {
            if cancel.is_cancelled() {
                info!("Cancelled before band {} of {}", index, total);
                let error = ReprojectError::Cancelled { completed_bands: index - 1, total_bands: total };
                return Err(trail.fail(PipelineStage::Writing, error));
            }

            progress.on_event(ProgressEvent::BandStarted { index, total });
            let band = source.read_band(index)
                .map_err(|e| trail.fail(PipelineStage::Writing, e.into()))?;
            sink.write_band(index, mapping.apply(&band, nodata))
                .map_err(|e| trail.fail(PipelineStage::Writing, e))?;
            progress.on_event(ProgressEvent::BandCompleted { index, total });
        }

        let primary = sink.finalize()
            .map_err(|e| trail.fail(PipelineStage::Writing, e))?;

        let world_file = match world_file::emit(&primary, &plan.transform, request.format) {
            Ok(WorldFileOutcome::Written(path)) => {
                trail.advance(PipelineState::WorldFileWritten);
                Some(path)
            },
            Ok(WorldFileOutcome::SkippedNotApplicable) => None,
            Err(e) => {
                // The primary output is only valid together with its world file
                if let Err(remove) = fs::remove_file(&primary) {
                    error!("Could not remove {}: {}", primary.display(), remove);
                }
                return Err(trail.fail(PipelineStage::WorldFile, e));
            },
        };

        trail.advance(PipelineState::Complete);
        info!("Reprojected {} into {}", request.input.display(), primary.display());

        Ok(ReprojectionOutcome {
            primary,
            world_file,
            plan,
            band_count: total,
            sample_type: source.sample_type(),
            states: trail.states,
        })
    }

    fn check_size(&self, input: &Path) -> ReprojectResult<()> {
        let size = fs::metadata(input)?.len();
        if size > self.config.max_input_bytes {
            return Err(ReprojectError::InputTooLarge { size, limit: self.config.max_input_bytes });
        }
        debug!("{} is {} bytes, limit {}", input.display(), size, self.config.max_input_bytes);
        Ok(())
    }
}
