use std::path::{Path, PathBuf};

use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_CANVAS_WIDTH: u32 = 800;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 600;
pub const DEFAULT_BACKGROUND: &str = "#ffffff";
pub const DEFAULT_FILL: &str = "#8B5CF6";
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;
pub const DEFAULT_BRUSH_WIDTH: f32 = 3.0;
pub const DEFAULT_MAX_SURFACE_SIDE: u32 = 8192;

/// Editor configuration.
///
/// Every field has a default, so a config file only needs the values it overrides:
///
/// ```json
/// { "history_capacity": 25, "default_fill": "#ff6b6b" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Hex color used for new scenes and after a clear
    pub background: String,
    /// Hex color selected when the editor starts
    pub default_fill: String,
    /// Maximum number of snapshots kept for undo
    pub history_capacity: usize,
    pub brush_width: f32,
    /// Background tasks still pending after this many seconds resolve as timed out.
    /// `None` waits forever.
    pub task_deadline_secs: Option<f64>,
    /// Largest width or height a render surface may be acquired with
    pub max_surface_side: u32,
    pub export_dir: PathBuf,
    pub export_file_name: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            background: DEFAULT_BACKGROUND.to_owned(),
            default_fill: DEFAULT_FILL.to_owned(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            brush_width: DEFAULT_BRUSH_WIDTH,
            task_deadline_secs: None,
            max_surface_side: DEFAULT_MAX_SURFACE_SIDE,
            export_dir: PathBuf::from("."),
            export_file_name: "design.png".to_owned(),
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::info!("Loading editor config from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks the values a `#[serde(default)]` parse cannot reject on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "canvas_width/canvas_height",
                reason: "canvas dimensions must be non-zero".to_owned(),
            });
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "history_capacity",
                reason: "at least one snapshot must be kept".to_owned(),
            });
        }
        if !(self.brush_width.is_finite() && self.brush_width > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "brush_width",
                reason: format!("{} is not a positive width", self.brush_width),
            });
        }
        if let Some(deadline) = self.task_deadline_secs {
            if !(deadline.is_finite() && deadline > 0.0) {
                return Err(ConfigError::InvalidValue {
                    field: "task_deadline_secs",
                    reason: format!("{deadline} is not a positive duration"),
                });
            }
        }
        self.background_color()?;
        self.fill_color()?;
        Ok(())
    }

    pub fn background_color(&self) -> Result<Color32, ConfigError> {
        parse_color("background", &self.background)
    }

    pub fn fill_color(&self) -> Result<Color32, ConfigError> {
        parse_color("default_fill", &self.default_fill)
    }

    pub fn export_path(&self) -> PathBuf {
        self.export_dir.join(&self.export_file_name)
    }
}

fn parse_color(field: &'static str, value: &str) -> Result<Color32, ConfigError> {
    Color32::from_hex(value).map_err(|_| ConfigError::InvalidColor {
        field,
        value: value.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EditorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.background_color().unwrap(), Color32::WHITE);
        assert_eq!(config.fill_color().unwrap(), Color32::from_rgb(0x8B, 0x5C, 0xF6));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EditorConfig::from_json_str(r#"{ "history_capacity": 25 }"#).unwrap();
        assert_eq!(config.history_capacity, 25);
        assert_eq!(config.canvas_width, DEFAULT_CANVAS_WIDTH);
        assert_eq!(config.default_fill, DEFAULT_FILL);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            EditorConfig::from_json_str(r#"{ "default_fill": "purple" }"#),
            Err(ConfigError::InvalidColor { field: "default_fill", .. })
        ));
        assert!(matches!(
            EditorConfig::from_json_str(r#"{ "history_capacity": 0 }"#),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            EditorConfig::from_json_str(r#"{ "task_deadline_secs": -1.0 }"#),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            EditorConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
