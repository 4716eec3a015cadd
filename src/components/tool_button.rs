use eframe::egui;

use crate::tools::ToolId;

/// Square icon button for one tool, highlighted when active
pub struct ToolButton {
    pub tool: ToolId,
    pub selected: bool,
}

impl ToolButton {
    pub fn new(tool: ToolId, selected: bool) -> Self {
        Self { tool, selected }
    }

    pub fn icon(tool: ToolId) -> &'static str {
        match tool {
            ToolId::Select => "↖",
            ToolId::Draw => "✏",
            ToolId::Rectangle => "⬛",
            ToolId::Circle => "⚫",
            ToolId::Text => "T",
        }
    }

    pub fn show(&self, ui: &mut egui::Ui) -> egui::Response {
        let button_size = egui::vec2(36.0, 36.0);
        let (rect, response) = ui.allocate_exact_size(button_size, egui::Sense::click());

        if ui.is_rect_visible(rect) {
            let bg_color = if self.selected {
                egui::Color32::from_rgb(139, 92, 246)
            } else if response.hovered() {
                egui::Color32::from_gray(60)
            } else {
                egui::Color32::from_gray(40)
            };
            ui.painter().rect_filled(rect, 6.0, bg_color);

            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                Self::icon(self.tool),
                egui::FontId::proportional(20.0),
                egui::Color32::WHITE,
            );

            if self.selected {
                ui.painter().rect_stroke(
                    rect,
                    6.0,
                    egui::Stroke::new(2.0, egui::Color32::from_rgb(196, 181, 253)),
                );
            }
        }

        if self.tool.is_shape() {
            response.on_hover_text(format!("{}: adds one to the canvas", self.tool.name()))
        } else {
            response.on_hover_text(self.tool.name())
        }
    }
}
