use egui::Vec2;
use serde::{Deserialize, Serialize};

use crate::raster::{AssetId, RasterImage};

/// Image element: a reference into the asset store plus the bitmap's natural size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageShape {
    pub asset: AssetId,
    pub source_width: u32,
    pub source_height: u32,
}

impl ImageShape {
    pub fn for_raster(asset: AssetId, raster: &RasterImage) -> Self {
        Self {
            asset,
            source_width: raster.width(),
            source_height: raster.height(),
        }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.source_width as f32, self.source_height as f32)
    }
}

/// Uniform scale that fits a `width`x`height` image inside the canvas without enlarging it.
/// `min(cw / w, ch / h, 1)`, or 1 for an empty source.
pub fn fit_scale(width: u32, height: u32, canvas_width: u32, canvas_height: u32) -> f32 {
    if width == 0 || height == 0 {
        return 1.0;
    }
    let sx = canvas_width as f32 / width as f32;
    let sy = canvas_height as f32 / height as f32;
    sx.min(sy).min(1.0)
}
