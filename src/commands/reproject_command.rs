//! Reprojection command
//!
//! Reprojects one GeoTIFF, either straight into the output directory or,
//! with `--bundle`, through the upload service so a ZIP archive is produced.

use std::fs;
use std::path::{Path, PathBuf};

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::{Command, CommandResult};
use crate::commands::config_from_args;
use crate::config::ReprojectConfig;
use crate::reproject::{
    CancellationToken, OutputFormat, PipelineFailure, PipelineStage, ProgressEvent, ReprojectError,
    ReprojectRequest, Reprojector,
};
use crate::service::{ReprojectionService, ServiceError, UploadRequest};
use crate::store::ArtifactStore;
use crate::utils::progress::ProgressTracker;

/// Command for reprojecting a GeoTIFF to an EPSG code
pub struct ReprojectCommand {
    input_file: PathBuf,
    epsg_code: String,
    format: String,
    bundle: bool,
    config: ReprojectConfig,
}

impl ReprojectCommand {
    pub fn new(args: &ArgMatches) -> CommandResult<Self> {
        let input_file = args.get_one::<String>("input")
            .ok_or(ServiceError::MissingParameter("input"))?;
        let epsg_code = args.get_one::<String>("epsg")
            .ok_or(ServiceError::MissingParameter("epsg"))?
            .clone();
        let format = args.get_one::<String>("format")
            .cloned()
            .unwrap_or_else(|| "tif".to_string());

        Ok(ReprojectCommand {
            input_file: PathBuf::from(input_file),
            epsg_code,
            format,
            bundle: args.get_flag("bundle"),
            config: config_from_args(args)?,
        })
    }

    fn run_direct(&self, tracker: &ProgressTracker) -> CommandResult<()> {
        let epsg_code = self.epsg_code.trim_start_matches("EPSG:").parse::<u32>()
            .map_err(|_| ServiceError::InvalidParameter(format!("Invalid EPSG code: {}", self.epsg_code)))?;
        let format: OutputFormat = self.format.parse()
            .map_err(|e: ReprojectError| ServiceError::UnsupportedFormat(e.to_string()))?;

        let file_name = self.input_file.file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ServiceError::InvalidParameter(format!("Bad input path {}", self.input_file.display())))?;
        let store = ArtifactStore::from_config(&self.config);
        let output = store.primary_path(ArtifactStore::base_name(file_name), format);

        let request = ReprojectRequest::new(&self.input_file, epsg_code, format, output);
        let reprojector = Reprojector::with_config(self.config.clone());
        let listener = |event: ProgressEvent| tracker.on_event(event);
        let outcome = reprojector.run_with(&request, &listener, &CancellationToken::new())?;

        info!("Destination grid: {}", outcome.plan);
        for artifact in outcome.artifacts() {
            info!("Wrote {}", artifact.display());
        }
        Ok(())
    }

    /// Rejects oversized inputs before they are read into memory
    fn check_input_size(&self) -> CommandResult<()> {
        let size = fs::metadata(&self.input_file)?.len();
        let limit = self.config.max_input_bytes;
        if size > limit {
            let error = ReprojectError::InputTooLarge { size, limit };
            return Err(PipelineFailure::new(PipelineStage::SizeCheck, &self.input_file, error).into());
        }
        Ok(())
    }

    fn run_bundled(&self, tracker: &ProgressTracker) -> CommandResult<()> {
        self.check_input_size()?;
        let upload = UploadRequest {
            file_name: file_name_of(&self.input_file),
            contents: fs::read(&self.input_file)?,
            epsg_code: Some(self.epsg_code.clone()),
            output_type: Some(self.format.clone()),
        };

        let service = ReprojectionService::with_config(self.config.clone());
        let listener = |event: ProgressEvent| tracker.on_event(event);
        let response = service.submit_with(&upload, &listener, &CancellationToken::new())?;

        info!("Archive {} ready at {}", response.archive_name, response.archive_path.display());
        info!("Download URL: {}", response.file_url);
        Ok(())
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

impl Command for ReprojectCommand {
    fn execute(&self) -> CommandResult<()> {
        info!("Reprojecting {} to EPSG:{} as {}", self.input_file.display(), self.epsg_code, self.format);
        let tracker = ProgressTracker::new(0, "reprojecting");

        let result = if self.bundle { self.run_bundled(&tracker) } else { self.run_direct(&tracker) };
        match &result {
            Ok(()) => tracker.finish(),
            Err(_) => tracker.abandon(),
        }
        result
    }
}
