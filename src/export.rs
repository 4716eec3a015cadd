use std::path::Path;
use std::str::FromStr;

use egui::Color32;

use crate::config::EditorConfig;
use crate::element::Shape;
use crate::error::ExportError;
use crate::scene::SceneStore;
use crate::surface::{RasterSurface, RenderSurface};

/// Encodings the exporter can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }

    /// Guess the format from a file name's extension
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| ExportError::UnsupportedFormat(path.display().to_string()))?;
        ext.parse()
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" | "image/png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" | "image/jpeg" => Ok(ExportFormat::Jpeg),
            _ => Err(ExportError::UnsupportedFormat(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// `0.0..=1.0`, ignored by PNG
    pub quality: f32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            quality: 1.0,
        }
    }
}

// Shown where an image's pixels are missing from the asset store
const MISSING_ASSET_COLOR: Color32 = Color32::from_gray(200);

/// Paint the background and then every object in sequence order, then flush
pub fn render_scene<S: RenderSurface + ?Sized>(surface: &mut S, store: &SceneStore) {
    surface.fill(store.background());
    for object in store.objects() {
        let placement = &object.placement;
        match &object.shape {
            Shape::Rectangle {
                width,
                height,
                corner_radius,
            } => surface.draw_rect(
                placement,
                egui::vec2(*width, *height),
                *corner_radius,
                object.fill,
            ),
            Shape::Circle { .. } => surface.draw_ellipse(placement, object.local_size(), object.fill),
            Shape::Text(text) => surface.draw_text(placement, text, object.fill),
            Shape::Image(image) => match store.asset(image.asset) {
                Some(raster) => surface.draw_bitmap(placement, raster),
                None => {
                    log::warn!("Missing pixels for {} ({})", object.id, image.asset);
                    surface.draw_rect(placement, image.size(), 0.0, MISSING_ASSET_COLOR);
                }
            },
        }
    }
    surface.flush();
}

/// Rasterizes the scene at the canvas size and encodes it
#[derive(Debug, Clone)]
pub struct ExportService {
    width: u32,
    height: u32,
    max_surface_side: u32,
}

impl ExportService {
    pub fn new(width: u32, height: u32, max_surface_side: u32) -> Self {
        Self {
            width,
            height,
            max_surface_side,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.canvas_width, config.canvas_height, config.max_surface_side)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Render the scene into a fresh software surface
    pub fn render(&self, store: &SceneStore) -> Result<RasterSurface, ExportError> {
        let mut surface = RasterSurface::acquire(self.width, self.height, self.max_surface_side)?;
        render_scene(&mut surface, store);
        Ok(surface)
    }

    /// Encoded image bytes of the current scene. Never modifies the store.
    pub fn export_raster(&self, store: &SceneStore, options: ExportOptions) -> Result<Vec<u8>, ExportError> {
        let surface = self.render(store)?;
        let bytes = surface.encode(options.format, options.quality)?;
        log::info!(
            "Exported {} objects as {} ({} bytes)",
            store.len(),
            options.format.extension(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Export and write the bytes to `path`
    pub fn export_to_file(
        &self,
        store: &SceneStore,
        options: ExportOptions,
        path: impl AsRef<Path>,
    ) -> Result<(), ExportError> {
        let path = path.as_ref();
        let bytes = self.export_raster(store, options)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        log::info!("Wrote {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::factory;

    #[test]
    fn test_parse_format() {
        assert_eq!("PNG".parse::<ExportFormat>().unwrap(), ExportFormat::Png);
        assert_eq!("jpeg".parse::<ExportFormat>().unwrap(), ExportFormat::Jpeg);
        assert_eq!(ExportFormat::from_path("out/design.jpg").unwrap(), ExportFormat::Jpeg);
        assert!(matches!(
            "gif".parse::<ExportFormat>(),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_render_paints_in_order() {
        let mut store = SceneStore::new(Color32::WHITE);
        store.add_object(factory::default_rectangle(Color32::RED));
        store.add_object(factory::create_rectangle(
            egui::pos2(100.0, 100.0),
            egui::vec2(10.0, 10.0),
            0.0,
            Color32::BLUE,
        ));
        let surface = ExportService::new(300, 300, 1000).render(&store).unwrap();
        assert_eq!(surface.pixel(105, 105), Some(Color32::BLUE));
        assert_eq!(surface.pixel(150, 150), Some(Color32::RED));
        assert_eq!(surface.pixel(10, 10), Some(Color32::WHITE));
    }

    #[test]
    fn test_missing_asset_draws_placeholder() {
        let mut store = SceneStore::new(Color32::WHITE);
        store.add_object(factory::create_image(
            crate::element::Placement::at(egui::pos2(0.0, 0.0)),
            crate::element::ImageShape {
                asset: crate::raster::AssetId::new(),
                source_width: 4,
                source_height: 4,
            },
        ));
        let surface = ExportService::new(8, 8, 100).render(&store).unwrap();
        assert_eq!(surface.pixel(1, 1), Some(MISSING_ASSET_COLOR));
    }
}
