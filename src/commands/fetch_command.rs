//! Archive retrieval command

use std::fs;
use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::{Command, CommandResult};
use crate::commands::config_from_args;
use crate::service::{ReprojectionService, ServiceError};

/// Looks up a produced archive by name and optionally copies it out
pub struct FetchCommand {
    archive_id: String,
    destination: Option<PathBuf>,
    service: ReprojectionService,
}

impl FetchCommand {
    pub fn new(args: &ArgMatches) -> CommandResult<Self> {
        let archive_id = args.get_one::<String>("fetch")
            .ok_or(ServiceError::MissingParameter("fetch"))?
            .clone();

        Ok(FetchCommand {
            archive_id,
            destination: args.get_one::<String>("output").map(PathBuf::from),
            service: ReprojectionService::with_config(config_from_args(args)?),
        })
    }
}

impl Command for FetchCommand {
    fn execute(&self) -> CommandResult<()> {
        let path = self.service.retrieve(&self.archive_id)?;

        match &self.destination {
            Some(destination) => {
                let bytes = self.service.read_archive(&self.archive_id)?;
                fs::write(destination, &bytes)?;
                info!("Copied {} ({} bytes) to {}", self.archive_id, bytes.len(), destination.display());
            },
            None => info!("Archive {} is at {}", self.archive_id, path.display()),
        }
        Ok(())
    }
}
