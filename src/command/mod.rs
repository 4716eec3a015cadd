mod commands;
mod history;

use thiserror::Error;

use crate::element::ObjectId;

pub use commands::Command;
pub use history::{HistoryEntry, HistoryManager};

/// Result type for command operations. Carries the object the command created or touched.
pub type CommandResult = Result<Option<ObjectId>, CommandError>;

/// Errors that can occur during command execution
#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    /// The command names an object that is not in the scene
    #[error("No object with id {0}")]
    InvalidReference(ObjectId),
    /// The command needs an image object but found another kind
    #[error("Object {0} is not an image")]
    NotAnImage(ObjectId),
}
