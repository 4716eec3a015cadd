use egui::{Color32, Key, Pos2};

use crate::command::Command;
use crate::element::{ObjectId, factory};
use crate::scene::SceneStore;

mod draw_tool;
mod select_tool;
mod stroke;

pub use draw_tool::DrawTool;
pub use select_tool::{SelectState, SelectTool};
pub use stroke::StrokeBuilder;

/// The tools offered in the toolbar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToolId {
    #[default]
    Select,
    Draw,
    Rectangle,
    Circle,
    Text,
}

impl ToolId {
    pub const ALL: [ToolId; 5] = [
        ToolId::Select,
        ToolId::Draw,
        ToolId::Rectangle,
        ToolId::Circle,
        ToolId::Text,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolId::Select => "Select",
            ToolId::Draw => "Draw",
            ToolId::Rectangle => "Rectangle",
            ToolId::Circle => "Circle",
            ToolId::Text => "Text",
        }
    }

    /// Shape tools add one object the moment they are chosen
    pub fn is_shape(&self) -> bool {
        matches!(self, ToolId::Rectangle | ToolId::Circle | ToolId::Text)
    }
}

/// What a tool sees of the editor while handling input
pub struct ToolContext<'a> {
    pub store: &'a SceneStore,
    pub selection: &'a mut Option<ObjectId>,
    pub fill: Color32,
    pub brush_width: f32,
}

/// Pointer handling shared by the canvas tools.
///
/// Handlers return a command only when the gesture should change the scene.
pub trait Tool {
    fn name(&self) -> &'static str;

    /// Called when the tool becomes active
    fn activate(&mut self) {}

    /// Called when another tool takes over. Any gesture in progress is abandoned.
    fn deactivate(&mut self);

    fn on_pointer_down(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> Option<Command>;

    fn on_pointer_move(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> Option<Command>;

    fn on_pointer_up(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> Option<Command>;

    /// Transient feedback for the canvas while a gesture is in progress
    fn preview(&self) -> ToolPreview<'_> {
        ToolPreview::None
    }
}

/// In-progress gesture feedback, drawn over the scene
#[derive(Debug, Clone, Copy)]
pub enum ToolPreview<'a> {
    None,
    Move { id: ObjectId, delta: egui::Vec2 },
    Stroke(&'a StrokeBuilder),
}

/// Enum over the pointer behaviours, so no boxing is needed
#[derive(Debug, Clone)]
pub enum ToolType {
    Select(SelectTool),
    Draw(DrawTool),
}

impl Tool for ToolType {
    fn name(&self) -> &'static str {
        match self {
            Self::Select(tool) => tool.name(),
            Self::Draw(tool) => tool.name(),
        }
    }

    fn activate(&mut self) {
        match self {
            Self::Select(tool) => tool.activate(),
            Self::Draw(tool) => tool.activate(),
        }
    }

    fn deactivate(&mut self) {
        match self {
            Self::Select(tool) => tool.deactivate(),
            Self::Draw(tool) => tool.deactivate(),
        }
    }

    fn on_pointer_down(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> Option<Command> {
        match self {
            Self::Select(tool) => tool.on_pointer_down(pos, ctx),
            Self::Draw(tool) => tool.on_pointer_down(pos, ctx),
        }
    }

    fn on_pointer_move(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> Option<Command> {
        match self {
            Self::Select(tool) => tool.on_pointer_move(pos, ctx),
            Self::Draw(tool) => tool.on_pointer_move(pos, ctx),
        }
    }

    fn on_pointer_up(&mut self, pos: Pos2, ctx: &mut ToolContext<'_>) -> Option<Command> {
        match self {
            Self::Select(tool) => tool.on_pointer_up(pos, ctx),
            Self::Draw(tool) => tool.on_pointer_up(pos, ctx),
        }
    }

    fn preview(&self) -> ToolPreview<'_> {
        match self {
            Self::Select(tool) => tool.preview(),
            Self::Draw(tool) => tool.preview(),
        }
    }
}

impl ToolType {
    /// Shape tools leave the canvas in select mode so the new object can be dragged
    pub fn for_tool(id: ToolId) -> Self {
        match id {
            ToolId::Draw => Self::Draw(DrawTool::new()),
            _ => Self::Select(SelectTool::new()),
        }
    }
}

/// Turns tool choices, pointer gestures and keys into scene commands.
///
/// Holds only UI state (active tool, selection, fill). The scene is read, never written;
/// every returned command is executed and committed to history by the caller.
#[derive(Debug, Clone)]
pub struct ToolController {
    active: ToolId,
    tool: ToolType,
    selection: Option<ObjectId>,
    fill: Color32,
    brush_width: f32,
}

impl ToolController {
    pub fn new(fill: Color32, brush_width: f32) -> Self {
        Self {
            active: ToolId::Select,
            tool: ToolType::for_tool(ToolId::Select),
            selection: None,
            fill,
            brush_width,
        }
    }

    pub fn active(&self) -> ToolId {
        self.active
    }

    pub fn tool(&self) -> &ToolType {
        &self.tool
    }

    /// Colour for subsequently created shapes and strokes
    pub fn set_fill(&mut self, fill: Color32) {
        self.fill = fill;
    }

    pub fn selection(&self) -> Option<ObjectId> {
        self.selection
    }

    pub fn select(&mut self, id: ObjectId) {
        self.selection = Some(id);
    }

    pub fn deselect(&mut self) {
        self.selection = None;
    }

    /// Drop the selection if its object no longer exists
    pub fn retain_selection(&mut self, store: &SceneStore) {
        if self.selection.is_some_and(|id| !store.contains(id)) {
            self.selection = None;
        }
    }

    /// Switch tools. Shape tools return the command that adds their default object.
    pub fn on_activate(&mut self, id: ToolId) -> Option<Command> {
        self.tool.deactivate();
        self.active = id;
        self.tool = ToolType::for_tool(id);
        self.tool.activate();
        log::info!("Activated tool: {}", id.name());

        let object = match id {
            ToolId::Rectangle => factory::default_rectangle(self.fill),
            ToolId::Circle => factory::default_circle(self.fill),
            ToolId::Text => factory::default_text(self.fill),
            ToolId::Select | ToolId::Draw => return None,
        };
        Some(Command::AddObject(object))
    }

    fn context<'a>(
        store: &'a SceneStore,
        selection: &'a mut Option<ObjectId>,
        fill: Color32,
        brush_width: f32,
    ) -> ToolContext<'a> {
        ToolContext {
            store,
            selection,
            fill,
            brush_width,
        }
    }

    pub fn on_pointer_down(&mut self, pos: Pos2, store: &SceneStore) -> Option<Command> {
        let mut ctx = Self::context(store, &mut self.selection, self.fill, self.brush_width);
        self.tool.on_pointer_down(pos, &mut ctx)
    }

    pub fn on_pointer_drag(&mut self, pos: Pos2, store: &SceneStore) -> Option<Command> {
        let mut ctx = Self::context(store, &mut self.selection, self.fill, self.brush_width);
        self.tool.on_pointer_move(pos, &mut ctx)
    }

    pub fn on_pointer_up(&mut self, pos: Pos2, store: &SceneStore) -> Option<Command> {
        let mut ctx = Self::context(store, &mut self.selection, self.fill, self.brush_width);
        self.tool.on_pointer_up(pos, &mut ctx)
    }

    /// Delete/Backspace remove the selected object, Escape clears the selection
    pub fn on_key(&mut self, key: Key) -> Option<Command> {
        match key {
            Key::Delete | Key::Backspace => {
                let id = self.selection.take()?;
                Some(Command::RemoveObject(id))
            }
            Key::Escape => {
                self.selection = None;
                None
            }
            _ => None,
        }
    }

    pub fn preview(&self) -> ToolPreview<'_> {
        self.tool.preview()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_and_draw_add_nothing() {
        let mut tools = ToolController::new(Color32::RED, 3.0);
        assert!(tools.on_activate(ToolId::Draw).is_none());
        assert_eq!(tools.tool().name(), "Draw");
        assert!(tools.on_activate(ToolId::Select).is_none());
        assert!(!ToolId::Draw.is_shape() && !ToolId::Select.is_shape());
    }

    #[test]
    fn test_shape_tool_uses_current_fill() {
        let mut tools = ToolController::new(Color32::RED, 3.0);
        tools.set_fill(Color32::GREEN);
        let Some(Command::AddObject(object)) = tools.on_activate(ToolId::Circle) else {
            panic!("circle tool should add an object");
        };
        assert_eq!(object.fill, Color32::GREEN);
        assert_eq!(object.kind(), "circle");
        assert_eq!(tools.active(), ToolId::Circle);
        assert!(ToolId::Circle.is_shape());
        assert_eq!(tools.tool().name(), "Select");
    }

    #[test]
    fn test_delete_needs_selection() {
        let mut tools = ToolController::new(Color32::RED, 3.0);
        assert!(tools.on_key(Key::Delete).is_none());
        let id = ObjectId::new();
        tools.select(id);
        assert!(matches!(tools.on_key(Key::Backspace), Some(Command::RemoveObject(removed)) if removed == id));
        assert!(tools.selection().is_none());
    }

    #[test]
    fn test_escape_deselects() {
        let mut tools = ToolController::new(Color32::RED, 3.0);
        tools.select(ObjectId::new());
        assert!(tools.on_key(Key::Escape).is_none());
        assert!(tools.selection().is_none());
    }
}
