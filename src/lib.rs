#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod command;
pub mod components;
pub mod config;
pub mod element;
pub mod error;
pub mod event;
pub mod export;
pub mod file_dialog;
pub mod file_handler;
pub mod id_generator;
pub mod panels;
pub mod raster;
pub mod renderer;
pub mod scene;
pub mod state;
pub mod surface;
pub mod tasks;
pub mod texture_manager;
pub mod tools;
pub mod util;

pub use app::{CanvasApp, Preferences};
pub use command::{Command, HistoryManager};
pub use config::EditorConfig;
pub use element::{ObjectId, Placement, SceneObject, Shape};
pub use error::{ConfigError, EditorError, ExportError, SceneError, TaskError};
pub use export::{ExportFormat, ExportOptions, ExportService, render_scene};
pub use raster::{AssetId, RasterImage};
pub use scene::{HistorySnapshot, Scene, SceneStore};
pub use state::Editor;
pub use surface::{RasterSurface, RenderSurface};
pub use tasks::{ImageProcessor, NearWhiteKeyer, TaskAdapter, TaskRequest, TaskStatus};
pub use tools::{ToolController, ToolId};
