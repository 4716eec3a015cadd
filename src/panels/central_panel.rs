use crate::CanvasApp;
use crate::renderer::CanvasTransform;

pub fn central_panel(app: &mut CanvasApp, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        let Some(size) = app.editor().map(|editor| {
            let config = editor.config();
            egui::vec2(config.canvas_width as f32, config.canvas_height as f32)
        }) else {
            return;
        };

        egui::ScrollArea::both().show(ui, |ui| {
            let (response, painter) = ui.allocate_painter(size, egui::Sense::click_and_drag());
            let transform = CanvasTransform::new(response.rect);

            // Pointer routing happens before painting so the frame shows the result
            if let Some(editor) = app.editor_mut() {
                let pointer = response.interact_pointer_pos().map(|pos| transform.to_canvas(pos));
                let mut result = Ok(None);
                if let Some(pos) = pointer {
                    if response.drag_started() || response.clicked() {
                        result = editor.pointer_down(pos);
                    }
                    if result.is_ok() && response.dragged() {
                        result = editor.pointer_drag(pos);
                    }
                    if result.is_ok() && (response.drag_stopped() || response.clicked()) {
                        result = editor.pointer_up(pos);
                    }
                }
                app.report("Edit failed", result);
            }

            if let Some((editor, renderer)) = app.parts_mut() {
                renderer.render(&painter, response.rect, editor);
            }
        });
    });
}
