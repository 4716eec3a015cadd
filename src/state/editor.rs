//! The editor as an explicit object with a `create`/`dispose` lifecycle.
//!
//! All scene mutation funnels through [`Editor::execute`], which commits exactly one
//! history snapshot per command. Background task results re-enter through
//! [`Editor::poll_tasks`] on the thread that owns the editor.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use egui::{Color32, Key, Pos2};

use crate::command::{Command, CommandError, HistoryManager};
use crate::config::EditorConfig;
use crate::element::{ObjectId, Placement, factory, fit_scale};
use crate::error::{EditorError, ExportError, TaskError};
use crate::event::{EditorEvent, EventBus, EventHandler, Notice};
use crate::export::{ExportFormat, ExportOptions, ExportService};
use crate::raster::RasterImage;
use crate::scene::SceneStore;
use crate::tasks::{
    ImageProcessor, NearWhiteKeyer, TaskAdapter, TaskCompletion, TaskId, TaskKind, TaskReport,
    TaskRequest, TaskStatus,
};
use crate::tools::{ToolController, ToolId};

pub struct Editor {
    config: EditorConfig,
    store: SceneStore,
    history: HistoryManager,
    tools: ToolController,
    tasks: TaskAdapter,
    exporter: ExportService,
    events: EventBus,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("objects", &self.store.len())
            .field("history", &self.history.len())
            .field("tool", &self.tools.active())
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

impl Editor {
    /// Start an editor with an empty scene and the reference background remover
    pub fn create(config: EditorConfig) -> Result<Self, EditorError> {
        Self::with_processor(config, Arc::new(NearWhiteKeyer::default()))
    }

    /// Start an editor whose background removal is done by `processor`
    pub fn with_processor(
        config: EditorConfig,
        processor: Arc<dyn ImageProcessor>,
    ) -> Result<Self, EditorError> {
        config.validate()?;
        let background = config.background_color()?;
        let fill = config.fill_color()?;

        let store = SceneStore::new(background);
        let mut history = HistoryManager::new(config.history_capacity);
        history.capture(&store, "Initial")?;

        log::info!(
            "Editor created: {}x{} canvas, history of {}, processor {}",
            config.canvas_width,
            config.canvas_height,
            history.capacity(),
            processor.name()
        );

        Ok(Self {
            tools: ToolController::new(fill, config.brush_width),
            tasks: TaskAdapter::new(processor, config.task_deadline_secs),
            exporter: ExportService::from_config(&config),
            events: EventBus::new(),
            config,
            store,
            history,
        })
    }

    /// Tear down: pending task results are discarded from here on
    pub fn dispose(mut self) {
        self.tasks.detach();
        log::info!("Editor disposed with {} objects", self.store.len());
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &SceneStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn tools(&self) -> &ToolController {
        &self.tools
    }

    pub fn tasks(&self) -> &TaskAdapter {
        &self.tasks
    }

    pub fn exporter(&self) -> &ExportService {
        &self.exporter
    }

    pub fn subscribe(&self, handler: Box<dyn EventHandler>) {
        self.events.subscribe(handler);
    }

    pub fn notify(&self, notice: Notice) {
        self.events.emit(EditorEvent::Notice(notice));
    }

    pub fn selection(&self) -> Option<ObjectId> {
        self.tools.selection()
    }

    fn set_selection(&mut self, selection: Option<ObjectId>) {
        if self.tools.selection() == selection {
            return;
        }
        match selection {
            Some(id) => self.tools.select(id),
            None => self.tools.deselect(),
        }
        self.events.emit(EditorEvent::SelectionChanged(selection));
    }

    /// Run one command and commit exactly one history snapshot for it.
    ///
    /// A failing command leaves both the scene and the history as they were.
    pub fn execute(&mut self, command: Command) -> Result<Option<ObjectId>, EditorError> {
        if matches!(command, Command::Clear) {
            self.clear_canvas()?;
            return Ok(None);
        }
        let label = command.label();
        let touched = command.execute(&mut self.store)?;
        self.commit(label)?;
        self.tools.retain_selection(&self.store);
        Ok(touched)
    }

    fn commit(&mut self, label: &'static str) -> Result<(), EditorError> {
        self.history.capture(&self.store, label)?;
        self.store.prune_assets(self.history.referenced_assets());
        self.events.emit(EditorEvent::SceneChanged {
            label,
            version: self.store.version(),
        });
        if let Some(latest) = self.history.latest() {
            self.events.emit(EditorEvent::HistoryCaptured {
                sequence: latest.snapshot.sequence(),
                entries: self.history.len(),
            });
        }
        Ok(())
    }

    /// Revert to the previous snapshot. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, EditorError> {
        let Some(snapshot) = self.history.undo() else {
            return Ok(false);
        };
        self.store.restore(&snapshot)?;
        self.store.prune_assets(self.history.referenced_assets());
        self.tools.retain_selection(&self.store);
        log::info!("Undo to snapshot #{}", snapshot.sequence());
        self.events.emit(EditorEvent::HistoryUndone {
            sequence: snapshot.sequence(),
            entries: self.history.len(),
        });
        self.events.emit(EditorEvent::SceneChanged {
            label: "Undo",
            version: self.store.version(),
        });
        Ok(true)
    }

    /// Empty the canvas and start a fresh history from the cleared state
    pub fn clear_canvas(&mut self) -> Result<(), EditorError> {
        Command::Clear.execute(&mut self.store)?;
        self.history.reset();
        self.commit("Clear")?;
        self.set_selection(None);
        self.notify(Notice::success("Canvas cleared", "Ready for your next design"));
        Ok(())
    }

    pub fn set_background(&mut self, color: Color32) -> Result<(), EditorError> {
        self.execute(Command::SetBackground(color)).map(|_| ())
    }

    /// Colour for subsequent shapes and strokes
    pub fn set_fill(&mut self, color: Color32) {
        self.tools.set_fill(color);
    }

    /// Switch tools. Shape tools add their default object and select it.
    pub fn activate_tool(&mut self, tool: ToolId) -> Result<Option<ObjectId>, EditorError> {
        let old = self.tools.active();
        let command = self.tools.on_activate(tool);
        self.events.emit(EditorEvent::ToolChanged { old, new: tool });

        let Some(command) = command else {
            return Ok(None);
        };
        let added = self.execute(command)?;
        self.set_selection(added);
        Ok(added)
    }

    pub fn pointer_down(&mut self, pos: Pos2) -> Result<Option<ObjectId>, EditorError> {
        let before = self.tools.selection();
        let command = self.tools.on_pointer_down(pos, &self.store);
        self.after_input(before, command)
    }

    pub fn pointer_drag(&mut self, pos: Pos2) -> Result<Option<ObjectId>, EditorError> {
        let before = self.tools.selection();
        let command = self.tools.on_pointer_drag(pos, &self.store);
        self.after_input(before, command)
    }

    pub fn pointer_up(&mut self, pos: Pos2) -> Result<Option<ObjectId>, EditorError> {
        let before = self.tools.selection();
        let command = self.tools.on_pointer_up(pos, &self.store);
        self.after_input(before, command)
    }

    pub fn key_pressed(&mut self, key: Key) -> Result<Option<ObjectId>, EditorError> {
        let before = self.tools.selection();
        let command = self.tools.on_key(key);
        self.after_input(before, command)
    }

    fn after_input(
        &mut self,
        before: Option<ObjectId>,
        command: Option<Command>,
    ) -> Result<Option<ObjectId>, EditorError> {
        let touched = match command {
            Some(command) => self.execute(command)?,
            None => None,
        };
        let after = self.tools.selection();
        if after != before {
            self.events.emit(EditorEvent::SelectionChanged(after));
        }
        Ok(touched)
    }

    pub fn delete_selected(&mut self) -> Result<bool, EditorError> {
        let Some(id) = self.tools.selection() else {
            return Ok(false);
        };
        self.set_selection(None);
        match self.execute(Command::RemoveObject(id)) {
            Ok(_) => Ok(true),
            Err(EditorError::Command(CommandError::InvalidReference(_))) => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub fn submit(&mut self, request: TaskRequest) -> Result<TaskId, TaskError> {
        let id = self.tasks.submit(request, &self.store)?;
        self.events.emit(EditorEvent::TaskStarted { id });
        Ok(id)
    }

    /// Start background removal for the selected object
    pub fn remove_background_selected(&mut self) -> Result<TaskId, TaskError> {
        let target = self.tools.selection().ok_or(TaskError::NoSelection)?;
        self.submit(TaskRequest::RemoveBackground { target })
    }

    /// Start decoding an uploaded file
    pub fn load_image(&mut self, bytes: Vec<u8>, name: impl Into<String>) -> Result<TaskId, TaskError> {
        self.submit(TaskRequest::Decode {
            bytes,
            name: name.into(),
        })
    }

    pub fn has_pending_tasks(&self) -> bool {
        self.tasks.has_pending()
    }

    /// Apply every finished task to the scene. Call from the owning thread.
    pub fn poll_tasks(&mut self) -> Vec<TaskReport> {
        let completions = self.tasks.poll();
        let mut reports = Vec::with_capacity(completions.len());
        for completion in completions {
            let report = self.apply_completion(completion);
            self.announce(&report);
            self.tasks.record(report.clone());
            reports.push(report);
        }
        reports
    }

    fn apply_completion(&mut self, completion: TaskCompletion) -> TaskReport {
        let TaskCompletion { id, kind, result } = completion;
        let (status, created) = match result {
            Err(err) => {
                log::warn!("{id} failed: {err}");
                (TaskStatus::Failed(err), None)
            }
            Ok(image) => match self.integrate(&kind, image) {
                Ok(created) => (TaskStatus::Succeeded, created),
                Err(status) => (status, None),
            },
        };
        TaskReport {
            id,
            kind,
            status,
            created,
        }
    }

    fn integrate(&mut self, kind: &TaskKind, image: RasterImage) -> Result<Option<ObjectId>, TaskStatus> {
        let image = Arc::new(image);
        match kind {
            TaskKind::RemoveBackground { target } => {
                if !self.store.contains(*target) {
                    log::info!("Target {target} is gone, dropping processed image");
                    return Err(TaskStatus::Orphaned);
                }
                let was_selected = self.tools.selection() == Some(*target);
                let created = self
                    .execute(Command::ReplaceImage {
                        target: *target,
                        image,
                    })
                    .map_err(|err| match err {
                        EditorError::Command(CommandError::InvalidReference(_)) => TaskStatus::Orphaned,
                        EditorError::Command(CommandError::NotAnImage(id)) => {
                            TaskStatus::Failed(TaskError::NotAnImage(id))
                        }
                        other => TaskStatus::Failed(TaskError::ProcessingFailed(other.to_string())),
                    })?;
                if was_selected {
                    self.set_selection(created);
                }
                Ok(created)
            }
            TaskKind::Decode { .. } => {
                let scale = fit_scale(
                    image.width(),
                    image.height(),
                    self.config.canvas_width,
                    self.config.canvas_height,
                );
                let placement = Placement::at(factory::DEFAULT_POSITION).with_scale(scale);
                let created = self
                    .execute(Command::AddImage { image, placement })
                    .map_err(|err| TaskStatus::Failed(TaskError::DecodeFailed(err.to_string())))?;
                self.set_selection(created);
                Ok(created)
            }
        }
    }

    fn announce(&self, report: &TaskReport) {
        let notice = match (&report.status, &report.kind) {
            (TaskStatus::Succeeded, TaskKind::RemoveBackground { .. }) => {
                Notice::success("Background removed", "The image was updated in place")
            }
            (TaskStatus::Succeeded, TaskKind::Decode { name }) => {
                Notice::success("Image added", name.clone())
            }
            (TaskStatus::Failed(err), kind) => Notice::error(kind.label(), err.to_string()),
            (TaskStatus::Orphaned, kind) => {
                Notice::info(kind.label(), "The object was removed before the task finished")
            }
            (TaskStatus::Pending, _) => return,
        };
        self.events.emit(EditorEvent::TaskFinished {
            id: report.id,
            status: report.status.clone(),
        });
        self.notify(notice);
    }

    /// Encode the current scene. The scene is never modified.
    pub fn export(&self, options: ExportOptions) -> Result<Vec<u8>, ExportError> {
        self.exporter.export_raster(&self.store, options).inspect_err(|err| {
            log::warn!("Export failed: {err}");
            self.notify(Notice::error("Export failed", err.to_string()));
        })
    }

    /// Where an export in `format` goes unless the user picks another place
    pub fn default_export_path(&self, format: ExportFormat) -> PathBuf {
        self.config.export_path().with_extension(format.extension())
    }

    /// Export to `path`, with its extension replaced by the format's. Returns the written path.
    pub fn export_to_file(&self, options: ExportOptions, path: &Path) -> Result<PathBuf, ExportError> {
        let path = path.with_extension(options.format.extension());
        match self.exporter.export_to_file(&self.store, options, &path) {
            Ok(()) => {
                self.notify(Notice::success("Design exported", path.display().to_string()));
                Ok(path)
            }
            Err(err) => {
                log::warn!("Export to {} failed: {err}", path.display());
                self.notify(Notice::error("Export failed", err.to_string()));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> Editor {
        Editor::create(EditorConfig::default()).unwrap()
    }

    #[test]
    fn test_create_starts_with_initial_snapshot() {
        let editor = editor();
        assert!(editor.store().is_empty());
        assert_eq!(editor.history().len(), 1);
        assert_eq!(editor.tools().active(), ToolId::Select);
    }

    #[test]
    fn test_shape_tool_adds_and_selects() {
        let mut editor = editor();
        let id = editor.activate_tool(ToolId::Rectangle).unwrap().unwrap();
        assert_eq!(editor.selection(), Some(id));
        assert_eq!(editor.history().len(), 2);
        assert_eq!(editor.store().get(id).unwrap().fill, Color32::from_hex("#8B5CF6").unwrap());
    }

    #[test]
    fn test_failed_command_commits_nothing() {
        let mut editor = editor();
        let result = editor.execute(Command::RemoveObject(ObjectId::new()));
        assert!(matches!(result, Err(EditorError::Command(CommandError::InvalidReference(_)))));
        assert_eq!(editor.history().len(), 1);
    }

    #[test]
    fn test_clear_restarts_history() {
        let mut editor = editor();
        editor.activate_tool(ToolId::Circle).unwrap();
        editor.activate_tool(ToolId::Text).unwrap();
        editor.clear_canvas().unwrap();
        assert!(editor.store().is_empty());
        assert_eq!(editor.history().len(), 1);
        assert!(!editor.undo().unwrap());
    }

    #[test]
    fn test_undo_drops_stale_selection() {
        let mut editor = editor();
        editor.activate_tool(ToolId::Circle).unwrap();
        assert!(editor.undo().unwrap());
        assert!(editor.selection().is_none());
    }

    #[test]
    fn test_remove_background_needs_selection() {
        let mut editor = editor();
        assert_eq!(editor.remove_background_selected(), Err(TaskError::NoSelection));

        let rect = editor.activate_tool(ToolId::Rectangle).unwrap().unwrap();
        assert_eq!(editor.remove_background_selected(), Err(TaskError::NotAnImage(rect)));
        assert!(!editor.has_pending_tasks());
    }
}
