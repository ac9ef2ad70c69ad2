//! CLI command implementations
//!
//! Reprojection is the default command; `--fetch` looks up a previously
//! produced archive instead.

pub mod command_traits;
pub mod fetch_command;
pub mod reproject_command;

pub use command_traits::{Command, CommandFactory, CommandResult};
pub use fetch_command::FetchCommand;
pub use reproject_command::ReprojectCommand;

use std::path::{Path, PathBuf};

use clap::ArgMatches;

use crate::config::ReprojectConfig;
use crate::service::ServiceError;

/// Factory for creating command instances based on CLI arguments
pub struct GeoreprojectCommandFactory;

impl GeoreprojectCommandFactory {
    pub fn new() -> Self {
        GeoreprojectCommandFactory
    }
}

impl Default for GeoreprojectCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandFactory for GeoreprojectCommandFactory {
    fn create_command(&self, args: &ArgMatches) -> CommandResult<Box<dyn Command>> {
        if args.contains_id("fetch") {
            Ok(Box::new(FetchCommand::new(args)?))
        } else {
            Ok(Box::new(ReprojectCommand::new(args)?))
        }
    }
}

/// Configuration from `--config`, with command line overrides applied
pub(crate) fn config_from_args(args: &ArgMatches) -> CommandResult<ReprojectConfig> {
    let mut config = match args.get_one::<String>("config") {
        Some(path) => ReprojectConfig::load(Path::new(path))
            .map_err(|e| ServiceError::InvalidParameter(format!("Config {}: {}", path, e)))?,
        None => ReprojectConfig::default(),
    };

    if let Some(dir) = args.get_one::<String>("output-dir") {
        config.output_dir = PathBuf::from(dir);
    }
    if let Some(dir) = args.get_one::<String>("upload-dir") {
        config.upload_dir = PathBuf::from(dir);
    }
    if let Some(limit) = args.get_one::<String>("max-input-bytes") {
        config.max_input_bytes = limit.parse()
            .map_err(|_| ServiceError::InvalidParameter(format!("Invalid byte limit: {}", limit)))?;
    }
    if let Some(compression) = args.get_one::<String>("compression") {
        config.tiff_compression = compression.to_ascii_lowercase();
    }

    Ok(config)
}
