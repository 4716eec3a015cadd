use crate::CanvasApp;
use crate::components::ToolButton;
use crate::tools::ToolId;

pub fn tools_panel(app: &mut CanvasApp, ctx: &egui::Context) {
    egui::SidePanel::left("tools_panel")
        .resizable(false)
        .default_width(220.0)
        .show(ctx, |ui| {
            ui.heading("Canvas Studio");
            ui.separator();

            let Some(active) = app.editor().map(|editor| editor.tools().active()) else {
                ui.label("Editor closed");
                return;
            };

            ui.horizontal_wrapped(|ui| {
                for tool in ToolId::ALL {
                    if ToolButton::new(tool, active == tool).show(ui).clicked() {
                        log::info!("Tool selected from UI: {}", tool.name());
                        if let Some(editor) = app.editor_mut() {
                            let result = editor.activate_tool(tool);
                            app.report("Could not add shape", result);
                        }
                    }
                }
            });

            ui.separator();

            ui.horizontal(|ui| {
                ui.label("Fill:");
                let mut fill = app.preferences().fill;
                if egui::color_picker::color_edit_button_srgba(
                    ui,
                    &mut fill,
                    egui::color_picker::Alpha::OnlyBlend,
                )
                .changed()
                {
                    app.set_fill(fill);
                }
            });

            ui.horizontal(|ui| {
                ui.label("Background:");
                let Some(mut background) = app.editor().map(|editor| editor.store().background()) else {
                    return;
                };
                let changed = egui::color_picker::color_edit_button_srgba(
                    ui,
                    &mut background,
                    egui::color_picker::Alpha::Opaque,
                )
                .changed();
                if changed {
                    if let Some(editor) = app.editor_mut() {
                        let result = editor.set_background(background);
                        app.report("Could not set background", result);
                    }
                }
            });

            ui.separator();

            ui.horizontal(|ui| {
                let can_undo = app.editor().is_some_and(|editor| editor.history().can_undo());
                let undo = ui
                    .add_enabled(can_undo, egui::Button::new("Undo"))
                    .on_hover_text("Ctrl/Cmd+Z")
                    .clicked();
                if undo {
                    if let Some(editor) = app.editor_mut() {
                        let result = editor.undo();
                        app.report("Undo failed", result);
                    }
                }
                if ui.button("Clear").clicked() {
                    if let Some(editor) = app.editor_mut() {
                        let result = editor.clear_canvas();
                        app.report("Clear failed", result);
                    }
                }
            });

            let has_selection = app.editor().is_some_and(|editor| editor.selection().is_some());
            ui.horizontal(|ui| {
                let delete = ui
                    .add_enabled(has_selection, egui::Button::new("Delete"))
                    .clicked();
                if delete {
                    if let Some(editor) = app.editor_mut() {
                        let result = editor.delete_selected();
                        app.report("Delete failed", result);
                    }
                }
                let remove_background = ui
                    .add_enabled(has_selection, egui::Button::new("Remove background"))
                    .clicked();
                if remove_background {
                    if let Some(editor) = app.editor_mut() {
                        let result = editor.remove_background_selected();
                        app.report("Background removal failed", result);
                    }
                }
            });

            ui.separator();
            ui.label("Export");

            let mut export = app.preferences().export.clone();
            ui.horizontal(|ui| {
                ui.radio_value(&mut export.jpeg, false, "PNG");
                ui.radio_value(&mut export.jpeg, true, "JPEG");
            });
            ui.add_enabled(
                export.jpeg,
                egui::Slider::new(&mut export.quality, 0.1..=1.0).text("quality"),
            );
            if export != app.preferences().export {
                app.preferences_mut().export = export;
            }

            if ui.button("Export design").clicked() {
                app.export_design();
            }

            ui.separator();
            if ui.button("Upload image").clicked() {
                app.upload_image();
            }
            ui.label("Or drop image files on the window.");

            if let Some(editor) = app.editor() {
                let pending = editor.tasks().pending_count();
                if pending > 0 {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(format!("{pending} task(s) running"));
                    });
                }

                ui.separator();
                let history = editor.history();
                ui.label(format!("History: {}/{}", history.len(), history.capacity()));
                egui::ScrollArea::vertical().max_height(180.0).show(ui, |ui| {
                    for entry in history.entries().rev() {
                        ui.label(format!("#{} {}", entry.snapshot.sequence(), entry.label));
                    }
                });
            }
        });
}
