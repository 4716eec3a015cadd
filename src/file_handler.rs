use std::collections::HashSet;

use eframe::egui;

/// Extensions accepted from drops and the upload dialog
pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// An image file picked up from drag-and-drop, ready to be decoded
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Collects dropped image files. Decoding happens later, off the UI thread.
#[derive(Debug, Default)]
pub struct FileHandler {
    dropped_files: Vec<egui::DroppedFile>,
    processed_files: HashSet<String>,
}

impl FileHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take any files dropped this frame. Returns true if there were some.
    pub fn check_for_dropped_files(&mut self, ctx: &egui::Context) -> bool {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if dropped.is_empty() {
            return false;
        }
        self.dropped_files = dropped;
        true
    }

    /// Read the pending dropped files, skipping non-images and ones already taken
    pub fn take_uploads(&mut self) -> Vec<ImageUpload> {
        let mut uploads = Vec::new();
        for file in std::mem::take(&mut self.dropped_files) {
            let file_name = display_name(&file);
            if self.processed_files.contains(&file_name) {
                continue;
            }
            if !is_image_file(&file) {
                log::warn!("Dropped file is not a supported type: {file_name}");
                continue;
            }
            if let Some(bytes) = read_bytes(&file, &file_name) {
                log::info!("Queued {file_name} ({} bytes)", bytes.len());
                self.processed_files.insert(file_name.clone());
                uploads.push(ImageUpload {
                    name: file_name,
                    bytes,
                });
            }
        }
        uploads
    }

    /// Dim the window while files hover over it
    pub fn preview_files_being_dropped(&self, ctx: &egui::Context) {
        use egui::{Align2, Color32, FontId, Id, LayerId, Order};

        let text = ctx.input(|i| {
            if i.raw.hovered_files.is_empty() {
                return None;
            }
            let mut text = "Drop to add to the canvas:\n".to_owned();
            for file in &i.raw.hovered_files {
                match &file.path {
                    Some(path) => text += &format!("\n{}", path.display()),
                    None if !file.mime.is_empty() => text += &format!("\n{}", file.mime),
                    None => text += "\n(unnamed file)",
                }
            }
            Some(text)
        });
        let Some(text) = text else {
            return;
        };

        let painter = ctx.layer_painter(LayerId::new(Order::Foreground, Id::new("file_drop_target")));
        let screen_rect = ctx.screen_rect();
        painter.rect_filled(screen_rect, 0.0, Color32::from_black_alpha(192));
        painter.text(
            screen_rect.center(),
            Align2::CENTER_CENTER,
            text,
            FontId::proportional(20.0),
            Color32::WHITE,
        );
    }

    /// Forget which files were already taken, so the same file can be dropped again
    pub fn clear_processed_files(&mut self) {
        self.dropped_files.clear();
        self.processed_files.clear();
    }
}

fn display_name(file: &egui::DroppedFile) -> String {
    if let Some(path) = &file.path {
        path.display().to_string()
    } else if !file.name.is_empty() {
        file.name.clone()
    } else {
        "unknown".to_owned()
    }
}

/// Check MIME type first, then the extension
pub fn is_image_file(file: &egui::DroppedFile) -> bool {
    if !file.mime.is_empty() {
        return file.mime.starts_with("image/");
    }
    let name = file
        .path
        .as_ref()
        .and_then(|path| path.extension())
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .or_else(|| file.name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase()));
    name.is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn read_bytes(file: &egui::DroppedFile, file_name: &str) -> Option<Vec<u8>> {
    if let Some(bytes) = &file.bytes {
        return Some(bytes.to_vec());
    }

    #[cfg(not(target_arch = "wasm32"))]
    if let Some(path) = &file.path {
        return match std::fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                log::error!("Failed to read {}: {err}", path.display());
                None
            }
        };
    }

    log::warn!("Dropped file has no accessible data: {file_name}");
    None
}
