use egui::Vec2;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TEXT: &str = "Your text here";
pub const DEFAULT_FONT_SIZE: f32 = 24.0;
pub const DEFAULT_FONT_FAMILY: &str = "Inter, sans-serif";

/// Line height as a multiple of the font size
pub const LINE_HEIGHT: f32 = 1.16;
// Average advance of a proportional glyph, used when no font metrics are at hand
const AVERAGE_ADVANCE: f32 = 0.55;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextShape {
    pub content: String,
    pub font_size: f32,
    pub font_family: String,
}

impl Default for TextShape {
    fn default() -> Self {
        Self {
            content: DEFAULT_TEXT.to_owned(),
            font_size: DEFAULT_FONT_SIZE,
            font_family: DEFAULT_FONT_FAMILY.to_owned(),
        }
    }
}

impl TextShape {
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.content.split('\n')
    }

    /// Layout box estimated from character counts.
    ///
    /// Used for hit testing and selection outlines; the raster surface measures real glyphs.
    pub fn approx_size(&self) -> Vec2 {
        let longest = self.lines().map(|line| line.chars().count()).max().unwrap_or(0);
        let line_count = self.lines().count().max(1);
        Vec2::new(
            (longest as f32 * self.font_size * AVERAGE_ADVANCE).max(self.font_size),
            line_count as f32 * self.font_size * LINE_HEIGHT,
        )
    }
}
