use thiserror::Error;

use crate::command::CommandError;
use crate::element::ObjectId;

/// Errors raised while serializing or restoring scene snapshots
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Failed to encode scene snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode scene snapshot #{sequence}: {source}")]
    Decode {
        sequence: u64,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that abort an export call. The scene is never modified by an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Render surface unavailable: {0}")]
    RenderSurfaceUnavailable(String),

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcomes of a failed background task. All of them are reported to the user,
/// none of them touch the scene.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TaskError {
    #[error("Image processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Could not decode image: {0}")]
    DecodeFailed(String),

    #[error("Task timed out after {0:.1}s")]
    Timeout(f64),

    #[error("Object {0} is not an image")]
    NotAnImage(ObjectId),

    #[error("Object {0} does not exist")]
    UnknownObject(ObjectId),

    #[error("Nothing is selected")]
    NoSelection,

    #[error("Task adapter has been detached")]
    Detached,
}

/// Errors that can occur while loading the editor configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid color {value:?} for {field}")]
    InvalidColor { field: &'static str, value: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Anything an [`Editor`](crate::state::Editor) operation can fail with
#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Task(#[from] TaskError),
}
