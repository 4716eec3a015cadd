use egui::{Color32, Pos2, Rect};

use crate::element::{calculate_bounds, distance_to_line_segment};
use crate::raster::RasterImage;

/// Points gathered while a freehand stroke is being drawn
#[derive(Debug, Clone)]
pub struct StrokeBuilder {
    points: Vec<Pos2>,
    color: Color32,
    width: f32,
}

impl StrokeBuilder {
    pub fn new(color: Color32, width: f32) -> Self {
        Self {
            points: Vec::new(),
            color,
            width,
        }
    }

    /// Add a point, skipping exact repeats of the previous one
    pub fn add_point(&mut self, point: Pos2) {
        if self.points.last() != Some(&point) {
            self.points.push(point);
        }
    }

    pub fn points(&self) -> &[Pos2] {
        &self.points
    }

    pub fn color(&self) -> Color32 {
        self.color
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Canvas area the finished bitmap will cover, snapped to whole pixels
    pub fn bounds(&self) -> Rect {
        let bounds = calculate_bounds(&self.points, self.width / 2.0 + 1.0);
        Rect::from_min_max(bounds.min.floor(), bounds.max.ceil())
    }

    /// Flatten the stroke into a bitmap with a round brush.
    ///
    /// Returns the bitmap and the canvas position of its top-left pixel, or `None`
    /// when there is nothing to draw.
    pub fn rasterize(&self) -> Option<(RasterImage, Pos2)> {
        if self.points.is_empty() || !(self.width > 0.0) {
            return None;
        }
        let bounds = self.bounds();
        let width = bounds.width() as u32;
        let height = bounds.height() as u32;
        if width == 0 || height == 0 {
            return None;
        }

        let radius = self.width / 2.0;
        let [r, g, b, a] = self.color.to_srgba_unmultiplied();
        let mut pixels = vec![0u8; width as usize * height as usize * 4];

        for y in 0..height {
            for x in 0..width {
                let centre = bounds.min + egui::vec2(x as f32 + 0.5, y as f32 + 0.5);
                let distance = self.distance_to(centre);
                // One pixel of falloff at the brush edge
                let coverage = (radius + 0.5 - distance).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                let i = (y as usize * width as usize + x as usize) * 4;
                pixels[i..i + 4].copy_from_slice(&[r, g, b, (a as f32 * coverage).round() as u8]);
            }
        }

        let image = RasterImage::from_rgba(width, height, pixels)?;
        Some((image, bounds.min))
    }

    fn distance_to(&self, point: Pos2) -> f32 {
        match self.points.as_slice() {
            [only] => (point - *only).length(),
            points => points
                .windows(2)
                .map(|pair| distance_to_line_segment(point, pair[0], pair[1]))
                .fold(f32::INFINITY, f32::min),
        }
    }
}
