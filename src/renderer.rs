use egui::{Color32, Painter, Pos2, Rect, Shape, Stroke, Vec2};

use crate::element::SceneObject;
use crate::state::Editor;
use crate::surface::RenderSurface as _;
use crate::texture_manager::{TextureGenerationError, TextureManager};
use crate::tools::ToolPreview;

const SCENE_TEXTURE: u64 = 0;
const SELECTION_COLOR: Color32 = Color32::from_rgb(33, 150, 243);
const PREVIEW_COLOR: Color32 = Color32::from_rgb(100, 181, 246);

/// Maps between canvas coordinates and the screen rect the canvas occupies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasTransform {
    pub origin: Pos2,
}

impl CanvasTransform {
    pub fn new(canvas_rect: Rect) -> Self {
        Self {
            origin: canvas_rect.min,
        }
    }

    pub fn to_screen(&self, canvas: Pos2) -> Pos2 {
        self.origin + canvas.to_vec2()
    }

    pub fn to_canvas(&self, screen: Pos2) -> Pos2 {
        (screen - self.origin).to_pos2()
    }
}

/// Draws the editor's scene on screen.
///
/// The scene is rasterized by the same code the exporter uses and shown as a
/// texture, which is rebuilt only when the store's version changes.
#[derive(Debug)]
pub struct Renderer {
    textures: TextureManager,
    ctx: egui::Context,
    last_error: Option<String>,
}

impl Renderer {
    pub fn new(ctx: &egui::Context) -> Self {
        Self {
            textures: TextureManager::new(2),
            ctx: ctx.clone(),
            last_error: None,
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Paint the scene, the selection outline and any in-progress gesture
    pub fn render(&mut self, painter: &Painter, canvas_rect: Rect, editor: &Editor) {
        self.textures.begin_frame();
        let transform = CanvasTransform::new(canvas_rect);
        let store = editor.store();

        let texture = self.textures.get_or_create_texture(
            SCENE_TEXTURE,
            store.version(),
            || {
                let surface = editor.exporter().render(store)?;
                Ok::<_, TextureGenerationError>(surface.pixel_buffer().to_color_image())
            },
            &self.ctx,
        );

        match texture {
            Ok(texture_id) => {
                self.last_error = None;
                painter.image(
                    texture_id,
                    canvas_rect,
                    Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                    Color32::WHITE,
                );
            }
            Err(err) => {
                if self.last_error.is_none() {
                    log::error!("Canvas render failed: {err}");
                }
                self.last_error = Some(err.to_string());
                painter.rect_filled(canvas_rect, 0.0, store.background());
            }
        }

        let preview = editor.tools().preview();
        let moving = match preview {
            ToolPreview::Move { id, delta } => Some((id, delta)),
            _ => None,
        };

        if let Some(object) = editor.selection().and_then(|id| store.get(id)) {
            let delta = moving
                .filter(|(id, _)| *id == object.id)
                .map_or(Vec2::ZERO, |(_, delta)| delta);
            Self::draw_outline(painter, &transform, object, delta);
        }

        if let ToolPreview::Stroke(stroke) = preview {
            let points: Vec<Pos2> = stroke.points().iter().map(|p| transform.to_screen(*p)).collect();
            match points.as_slice() {
                [only] => {
                    painter.circle_filled(*only, stroke.width() / 2.0, stroke.color());
                }
                _ => {
                    painter.add(Shape::line(points, Stroke::new(stroke.width(), stroke.color())));
                }
            }
        }
    }

    fn draw_outline(painter: &Painter, transform: &CanvasTransform, object: &SceneObject, delta: Vec2) {
        let corners = object
            .placement
            .world_corners(object.local_size())
            .map(|corner| transform.to_screen(corner + delta));
        let color = if delta == Vec2::ZERO {
            SELECTION_COLOR
        } else {
            PREVIEW_COLOR
        };
        painter.add(Shape::closed_line(corners.to_vec(), Stroke::new(1.5, color)));
        for corner in corners {
            painter.rect_filled(Rect::from_center_size(corner, Vec2::splat(6.0)), 1.0, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::tools::ToolId;

    #[test]
    fn test_canvas_transform_round_trip() {
        let transform = CanvasTransform::new(Rect::from_min_size(egui::pos2(20.0, 40.0), egui::vec2(800.0, 600.0)));
        let screen = transform.to_screen(egui::pos2(100.0, 100.0));
        assert_eq!(screen, egui::pos2(120.0, 140.0));
        assert_eq!(transform.to_canvas(screen), egui::pos2(100.0, 100.0));
    }

    #[test]
    fn test_render_basics() {
        let ctx = egui::Context::default();
        let mut editor = Editor::create(EditorConfig {
            canvas_width: 64,
            canvas_height: 48,
            ..EditorConfig::default()
        })
        .unwrap();
        editor.activate_tool(ToolId::Rectangle).unwrap();

        let mut renderer = Renderer::new(&ctx);
        let rect = Rect::from_min_size(Pos2::ZERO, egui::vec2(64.0, 48.0));
        let painter = Painter::new(ctx.clone(), egui::LayerId::background(), rect);
        renderer.render(&painter, rect, &editor);
        assert!(renderer.last_error().is_none());
    }
}
