use std::sync::Arc;

use egui::Pos2;

use super::{StrokeBuilder, Tool, ToolContext, ToolPreview};
use crate::command::Command;
use crate::element::Placement;

/// Freehand brush. The finished stroke becomes a bitmap image object.
#[derive(Debug, Clone, Default)]
pub struct DrawTool {
    current_stroke: Option<StrokeBuilder>,
}

impl DrawTool {
    pub fn new() -> Self {
        Self {
            current_stroke: None,
        }
    }

    pub fn is_drawing(&self) -> bool {
        self.current_stroke.is_some()
    }
}

impl Tool for DrawTool {
    fn name(&self) -> &'static str {
        "Draw"
    }

    fn activate(&mut self) {
        self.current_stroke = None;
    }

    fn deactivate(&mut self) {
        self.current_stroke = None;
    }

    fn on_pointer_down(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> Option<Command> {
        let mut stroke = StrokeBuilder::new(ctx.fill, ctx.brush_width);
        stroke.add_point(pos);
        self.current_stroke = Some(stroke);
        *ctx.selection = None;
        None
    }

    fn on_pointer_move(&mut self, pos: Pos2, _ctx: &mut ToolContext<'_>) -> Option<Command> {
        if let Some(stroke) = &mut self.current_stroke {
            stroke.add_point(pos);
        }
        None
    }

    fn on_pointer_up(&mut self, pos: Pos2, _ctx: &mut ToolContext<'_>) -> Option<Command> {
        let mut stroke = self.current_stroke.take()?;
        stroke.add_point(pos);
        let (image, origin) = stroke.rasterize()?;
        log::debug!(
            "Stroke of {} points rasterized to {}x{}",
            stroke.points().len(),
            image.width(),
            image.height()
        );
        Some(Command::AddImage {
            image: Arc::new(image),
            placement: Placement::at(origin),
        })
    }

    fn preview(&self) -> ToolPreview<'_> {
        match &self.current_stroke {
            Some(stroke) => ToolPreview::Stroke(stroke),
            None => ToolPreview::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ObjectId;
    use crate::scene::SceneStore;
    use egui::{Color32, pos2};

    #[test]
    fn test_stroke_becomes_image_command() {
        let store = SceneStore::default();
        let mut selection: Option<ObjectId> = None;
        let mut ctx = ToolContext {
            store: &store,
            selection: &mut selection,
            fill: Color32::BLACK,
            brush_width: 3.0,
        };
        let mut tool = DrawTool::new();
        tool.on_pointer_down(pos2(10.0, 10.0), &mut ctx);
        tool.on_pointer_move(pos2(20.0, 20.0), &mut ctx);
        assert!(tool.is_drawing());

        let Some(Command::AddImage { image, placement }) = tool.on_pointer_up(pos2(30.0, 10.0), &mut ctx) else {
            panic!("expected an image command");
        };
        assert!(!tool.is_drawing());
        assert!(placement.position.x <= 10.0 - 1.5);
        assert!(image.width() >= 20);
    }

    #[test]
    fn test_pointer_up_without_down_is_noop() {
        let store = SceneStore::default();
        let mut selection = None;
        let mut ctx = ToolContext {
            store: &store,
            selection: &mut selection,
            fill: Color32::BLACK,
            brush_width: 3.0,
        };
        assert!(DrawTool::new().on_pointer_up(pos2(1.0, 1.0), &mut ctx).is_none());
    }
}
