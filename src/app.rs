use std::sync::Arc;

use egui::Color32;

use crate::config::EditorConfig;
use crate::error::EditorError;
use crate::event::{LogEventHandler, Notice, NoticeLevel, NoticeQueue};
use crate::export::ExportOptions;
use crate::file_dialog::{DialogOutcome, FileDialogs};
use crate::file_handler::FileHandler;
use crate::panels;
use crate::renderer::Renderer;
use crate::state::Editor;
use crate::tasks::{ImageProcessor, NearWhiteKeyer};
use crate::util::time;

// Seconds a notice stays on screen
const NOTICE_LIFETIME: f64 = 4.0;

/// What survives a restart. The scene itself is never persisted.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Preferences {
    pub fill: Color32,
    pub export: ExportPreferences,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            fill: Color32::from_rgb(0x8B, 0x5C, 0xF6),
            export: ExportPreferences::default(),
        }
    }
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ExportPreferences {
    pub jpeg: bool,
    pub quality: f32,
}

impl Default for ExportPreferences {
    fn default() -> Self {
        Self {
            jpeg: false,
            quality: 0.92,
        }
    }
}

impl ExportPreferences {
    pub fn options(&self) -> ExportOptions {
        ExportOptions {
            format: if self.jpeg {
                crate::export::ExportFormat::Jpeg
            } else {
                crate::export::ExportFormat::Png
            },
            quality: self.quality,
        }
    }
}

pub struct CanvasApp {
    editor: Option<Editor>,
    renderer: Renderer,
    file_handler: FileHandler,
    dialogs: FileDialogs,
    notices: NoticeQueue,
    visible: Vec<(Notice, f64)>,
    preferences: Preferences,
}

impl CanvasApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>, config: EditorConfig) -> Result<Self, EditorError> {
        let preferences: Preferences = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();
        Self::with_processor(
            &cc.egui_ctx,
            config,
            preferences,
            Arc::new(NearWhiteKeyer::default()),
        )
    }

    pub fn with_processor(
        ctx: &egui::Context,
        config: EditorConfig,
        preferences: Preferences,
        processor: Arc<dyn ImageProcessor>,
    ) -> Result<Self, EditorError> {
        let mut editor = Editor::with_processor(config, processor)?;
        editor.set_fill(preferences.fill);

        let notices = NoticeQueue::new();
        editor.subscribe(Box::new(notices.clone()));
        editor.subscribe(Box::new(LogEventHandler));

        Ok(Self {
            editor: Some(editor),
            renderer: Renderer::new(ctx),
            file_handler: FileHandler::new(),
            dialogs: FileDialogs::new(),
            notices,
            visible: Vec::new(),
            preferences,
        })
    }

    pub fn editor(&self) -> Option<&Editor> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut Editor> {
        self.editor.as_mut()
    }

    /// The editor and renderer together, for painting
    pub fn parts_mut(&mut self) -> Option<(&Editor, &mut Renderer)> {
        Some((self.editor.as_ref()?, &mut self.renderer))
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn preferences_mut(&mut self) -> &mut Preferences {
        &mut self.preferences
    }

    pub fn set_fill(&mut self, fill: Color32) {
        self.preferences.fill = fill;
        if let Some(editor) = &mut self.editor {
            editor.set_fill(fill);
        }
    }

    /// Turn an operation's error into a notice instead of dropping it
    pub fn report<T>(&self, title: &str, result: Result<T, impl std::fmt::Display>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("{title}: {err}");
                self.notices.push(Notice::error(title, err.to_string()));
                None
            }
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        self.file_handler.preview_files_being_dropped(ctx);
        if !self.file_handler.check_for_dropped_files(ctx) {
            return;
        }
        for upload in self.file_handler.take_uploads() {
            let Some(editor) = &mut self.editor else {
                return;
            };
            let result = editor.load_image(upload.bytes, upload.name);
            self.report("Upload failed", result);
        }
        // Allow the same file to be dropped again later
        self.file_handler.clear_processed_files();
    }

    /// Open the image picker. The chosen file is decoded once the dialog resolves.
    pub fn upload_image(&mut self) {
        self.dialogs.pick_image();
    }

    /// Export with the current preferences to a location the user picks
    pub fn export_design(&mut self) {
        let options = self.export_options();
        let Some(editor) = &self.editor else {
            return;
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let default = editor.default_export_path(options.format);
            if let Some(path) = crate::file_dialog::choose_export_path(&default, options.format) {
                // The editor announces success and failure itself
                editor.export_to_file(options, &path).ok();
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let file_name = editor
                .default_export_path(options.format)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("design.{}", options.format.extension()));
            // The editor announces a failed export itself
            if let Ok(bytes) = editor.export(options) {
                self.dialogs.download(file_name, options.format, bytes);
            }
        }
    }

    fn handle_dialogs(&mut self, ctx: &egui::Context) {
        for outcome in self.dialogs.poll() {
            match outcome {
                DialogOutcome::Picked(upload) => {
                    let Some(editor) = &mut self.editor else {
                        return;
                    };
                    let result = editor.load_image(upload.bytes, upload.name);
                    self.report("Upload failed", result);
                }
                DialogOutcome::Downloaded(name) => {
                    self.notices.push(Notice::success("Design exported", name));
                }
                DialogOutcome::Failed(message) => {
                    log::warn!("File dialog failed: {message}");
                    self.notices.push(Notice::error("File dialog failed", message));
                }
            }
        }
        if self.dialogs.has_pending() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (undo, keys) = ctx.input(|i| {
            let undo = i.modifiers.command && i.key_pressed(egui::Key::Z);
            let keys: Vec<egui::Key> = [egui::Key::Delete, egui::Key::Backspace, egui::Key::Escape]
                .into_iter()
                .filter(|key| i.key_pressed(*key))
                .collect();
            (undo, keys)
        });
        let Some(editor) = &mut self.editor else {
            return;
        };
        if undo {
            let result = editor.undo();
            self.report("Undo failed", result);
            return;
        }
        for key in keys {
            let Some(editor) = &mut self.editor else {
                return;
            };
            let result = editor.key_pressed(key);
            self.report("Edit failed", result);
        }
    }

    fn poll_tasks(&mut self, ctx: &egui::Context) {
        let Some(editor) = &mut self.editor else {
            return;
        };
        editor.poll_tasks();
        if editor.has_pending_tasks() {
            // Keep polling until the workers report back
            ctx.request_repaint_after(std::time::Duration::from_millis(50));
        }
    }

    fn show_notices(&mut self, ctx: &egui::Context) {
        let now = time::current_time_secs();
        self.visible
            .extend(self.notices.drain().into_iter().map(|notice| (notice, now + NOTICE_LIFETIME)));
        self.visible.retain(|(_, expires)| *expires > now);
        if self.visible.is_empty() {
            return;
        }

        egui::Area::new(egui::Id::new("notices"))
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-16.0, -16.0))
            .show(ctx, |ui| {
                for (notice, _) in &self.visible {
                    let color = match notice.level {
                        NoticeLevel::Info => ui.visuals().text_color(),
                        NoticeLevel::Success => Color32::from_rgb(74, 222, 128),
                        NoticeLevel::Error => ui.visuals().error_fg_color,
                    };
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.colored_label(color, egui::RichText::new(&notice.title).strong());
                        if !notice.message.is_empty() {
                            ui.label(&notice.message);
                        }
                    });
                }
            });
        ctx.request_repaint_after(std::time::Duration::from_millis(250));
    }

    pub fn export_options(&self) -> ExportOptions {
        self.preferences.export.options()
    }
}

impl eframe::App for CanvasApp {
    /// Called by the framework to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.preferences);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_tasks(ctx);
        self.handle_dialogs(ctx);
        self.handle_dropped_files(ctx);
        self.handle_shortcuts(ctx);

        panels::tools_panel(self, ctx);
        panels::central_panel(self, ctx);

        self.show_notices(ctx);
    }
}

impl Drop for CanvasApp {
    fn drop(&mut self) {
        if let Some(editor) = self.editor.take() {
            editor.dispose();
        }
    }
}
