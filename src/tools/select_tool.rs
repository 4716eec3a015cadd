use egui::{Pos2, Vec2};

use super::{Tool, ToolContext, ToolPreview};
use crate::command::Command;
use crate::element::ObjectId;

// Drags shorter than this are treated as clicks
const DRAG_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectState {
    Idle,
    Dragging {
        id: ObjectId,
        start: Pos2,
        current: Pos2,
    },
}

/// Click to select the topmost object, drag to move it
#[derive(Debug, Clone)]
pub struct SelectTool {
    state: SelectState,
}

impl Default for SelectTool {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectTool {
    pub fn new() -> Self {
        Self {
            state: SelectState::Idle,
        }
    }

    pub fn state(&self) -> SelectState {
        self.state
    }

    fn drag_delta(&self) -> Option<(ObjectId, Vec2)> {
        match self.state {
            SelectState::Dragging { id, start, current } => Some((id, current - start)),
            SelectState::Idle => None,
        }
    }
}

impl Tool for SelectTool {
    fn name(&self) -> &'static str {
        "Select"
    }

    fn deactivate(&mut self) {
        self.state = SelectState::Idle;
    }

    fn on_pointer_down(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> Option<Command> {
        match ctx.store.hit_test(pos) {
            Some(object) => {
                log::debug!("Selected {} ({})", object.id, object.kind());
                *ctx.selection = Some(object.id);
                self.state = SelectState::Dragging {
                    id: object.id,
                    start: pos,
                    current: pos,
                };
            }
            None => {
                *ctx.selection = None;
                self.state = SelectState::Idle;
            }
        }
        None
    }

    fn on_pointer_move(&mut self, pos: Pos2, _ctx: &mut ToolContext<'_>) -> Option<Command> {
        if let SelectState::Dragging { current, .. } = &mut self.state {
            *current = pos;
        }
        None
    }

    fn on_pointer_up(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> Option<Command> {
        if let SelectState::Dragging { current, .. } = &mut self.state {
            *current = pos;
        }
        let dragged = self.drag_delta();
        self.state = SelectState::Idle;

        let (id, delta) = dragged?;
        if delta.length() < DRAG_THRESHOLD || !ctx.store.contains(id) {
            return None;
        }
        Some(Command::MoveObject { id, delta })
    }

    fn preview(&self) -> ToolPreview<'_> {
        match self.drag_delta() {
            Some((id, delta)) => ToolPreview::Move { id, delta },
            None => ToolPreview::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::factory;
    use crate::scene::SceneStore;
    use egui::{Color32, pos2, vec2};

    fn ctx<'a>(store: &'a SceneStore, selection: &'a mut Option<ObjectId>) -> ToolContext<'a> {
        ToolContext {
            store,
            selection,
            fill: Color32::RED,
            brush_width: 3.0,
        }
    }

    #[test]
    fn test_click_selects_topmost() {
        let mut store = SceneStore::default();
        store.add_object(factory::default_rectangle(Color32::RED));
        let top = store.add_object(factory::default_circle(Color32::BLUE));
        let mut selection = None;
        let mut tool = SelectTool::new();

        assert!(tool.on_pointer_down(pos2(150.0, 150.0), &mut ctx(&store, &mut selection)).is_none());
        assert!(tool.on_pointer_up(pos2(150.0, 150.0), &mut ctx(&store, &mut selection)).is_none());
        assert_eq!(selection, Some(top));
    }

    #[test]
    fn test_drag_yields_one_move() {
        let mut store = SceneStore::default();
        let id = store.add_object(factory::default_rectangle(Color32::RED));
        let mut selection = None;
        let mut tool = SelectTool::new();

        tool.on_pointer_down(pos2(110.0, 110.0), &mut ctx(&store, &mut selection));
        assert!(tool.on_pointer_move(pos2(120.0, 115.0), &mut ctx(&store, &mut selection)).is_none());
        assert!(matches!(tool.preview(), ToolPreview::Move { .. }));
        let command = tool.on_pointer_up(pos2(130.0, 120.0), &mut ctx(&store, &mut selection));

        match command {
            Some(Command::MoveObject { id: moved, delta }) => {
                assert_eq!(moved, id);
                assert_eq!(delta, vec2(20.0, 10.0));
            }
            other => panic!("expected a move, got {other:?}"),
        }
        assert_eq!(tool.state(), SelectState::Idle);
    }

    #[test]
    fn test_click_on_empty_canvas_deselects() {
        let store = SceneStore::default();
        let mut selection = Some(ObjectId::new());
        let mut tool = SelectTool::new();
        tool.on_pointer_down(pos2(5.0, 5.0), &mut ctx(&store, &mut selection));
        assert!(selection.is_none());
        assert!(tool.on_pointer_up(pos2(50.0, 50.0), &mut ctx(&store, &mut selection)).is_none());
    }
}
