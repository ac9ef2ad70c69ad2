//! Command pattern interfaces
//!
//! Each CLI operation is a `Command` built from the parsed arguments by a
//! `CommandFactory`.

use clap::ArgMatches;

use crate::service::ServiceError;

/// Result of building or running a command
pub type CommandResult<T> = Result<T, ServiceError>;

/// Represents an executable command in the application
pub trait Command {
    /// Execute the command
    fn execute(&self) -> CommandResult<()>;
}

/// Factory for creating commands from CLI arguments
pub trait CommandFactory {
    /// Create the Command selected by `args`
    fn create_command(&self, args: &ArgMatches) -> CommandResult<Box<dyn Command>>;
}
