use futures::channel::oneshot;

use crate::export::ExportFormat;
use crate::file_handler::{IMAGE_EXTENSIONS, ImageUpload};

/// What a finished dialog produced
#[derive(Debug, Clone, PartialEq)]
pub enum DialogOutcome {
    Picked(ImageUpload),
    /// A browser download was handed the export
    Downloaded(String),
    Failed(String),
}

/// File pickers behind one polling interface.
///
/// Native dialogs block until closed and resolve immediately. Browser dialogs
/// resolve on a later frame, so callers poll every frame.
#[derive(Debug, Default)]
pub struct FileDialogs {
    pending: Vec<oneshot::Receiver<Option<DialogOutcome>>>,
}

impl FileDialogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Ask the user for an image to upload
    pub fn pick_image(&mut self) {
        let (sender, receiver) = oneshot::channel();
        self.pending.push(receiver);

        #[cfg(not(target_arch = "wasm32"))]
        {
            let picked = rfd::FileDialog::new()
                .set_title("Upload image")
                .add_filter("Images", &IMAGE_EXTENSIONS)
                .pick_file();
            deliver(sender, picked.map(|path| read_upload(&path)));
        }

        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(async move {
            let picked = rfd::AsyncFileDialog::new()
                .set_title("Upload image")
                .add_filter("Images", &IMAGE_EXTENSIONS)
                .pick_file()
                .await;
            let outcome = match picked {
                Some(handle) => Some(DialogOutcome::Picked(ImageUpload {
                    name: handle.file_name(),
                    bytes: handle.read().await,
                })),
                None => None,
            };
            deliver(sender, outcome);
        });
    }

    /// Offer encoded export bytes to the browser as a download
    #[cfg(target_arch = "wasm32")]
    pub fn download(&mut self, file_name: String, format: ExportFormat, bytes: Vec<u8>) {
        let (sender, receiver) = oneshot::channel();
        self.pending.push(receiver);
        wasm_bindgen_futures::spawn_local(async move {
            let Some(handle) = rfd::AsyncFileDialog::new()
                .set_title("Export design")
                .set_file_name(&file_name)
                .add_filter(format.extension().to_uppercase(), &[format.extension()])
                .save_file()
                .await
            else {
                deliver(sender, None);
                return;
            };
            let outcome = match handle.write(&bytes).await {
                Ok(()) => DialogOutcome::Downloaded(handle.file_name()),
                Err(err) => DialogOutcome::Failed(err.to_string()),
            };
            deliver(sender, Some(outcome));
        });
    }

    /// Outcomes of dialogs that closed since the last call. Cancelled dialogs yield nothing.
    pub fn poll(&mut self) -> Vec<DialogOutcome> {
        let mut outcomes = Vec::new();
        self.pending.retain_mut(|receiver| match receiver.try_recv() {
            Ok(Some(outcome)) => {
                outcomes.extend(outcome);
                false
            }
            Ok(None) => true,
            Err(oneshot::Canceled) => false,
        });
        outcomes
    }
}

/// Ask where to write an export, starting from `default`
#[cfg(not(target_arch = "wasm32"))]
pub fn choose_export_path(default: &std::path::Path, format: ExportFormat) -> Option<std::path::PathBuf> {
    let mut dialog = rfd::FileDialog::new()
        .set_title("Export design")
        .add_filter(format.extension().to_uppercase(), &[format.extension()]);
    if let Some(name) = default.file_name() {
        dialog = dialog.set_file_name(name.to_string_lossy());
    }
    if let Some(dir) = default.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        dialog = dialog.set_directory(dir);
    }
    dialog.save_file()
}

fn deliver(sender: oneshot::Sender<Option<DialogOutcome>>, outcome: Option<DialogOutcome>) {
    if sender.send(outcome).is_err() {
        log::debug!("Dialog closed after its owner went away");
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn read_upload(path: &std::path::Path) -> DialogOutcome {
    match std::fs::read(path) {
        Ok(bytes) => {
            log::info!("Picked {} ({} bytes)", path.display(), bytes.len());
            DialogOutcome::Picked(ImageUpload {
                name: path.display().to_string(),
                bytes,
            })
        }
        Err(err) => {
            log::error!("Failed to read {}: {err}", path.display());
            DialogOutcome::Failed(format!("{}: {err}", path.display()))
        }
    }
}
