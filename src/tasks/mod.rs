use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::oneshot;

use crate::element::ObjectId;
use crate::error::TaskError;
use crate::id_generator;
use crate::raster::RasterImage;
use crate::scene::SceneStore;
use crate::util::time;

mod processor;

pub use processor::{DEFAULT_KEY_THRESHOLD, ImageProcessor, NearWhiteKeyer};

// Finished reports kept for the UI
const RECENT_REPORTS: usize = 32;

pub type JobResult = Result<RasterImage, TaskError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Work that can be handed to the adapter
#[derive(Debug, Clone)]
pub enum TaskRequest {
    /// Run the image processor over an image object's pixels
    RemoveBackground { target: ObjectId },
    /// Decode an uploaded file into a new image object
    Decode { bytes: Vec<u8>, name: String },
}

/// What a task was started for, kept while it runs
#[derive(Debug, Clone, PartialEq)]
pub enum TaskKind {
    RemoveBackground { target: ObjectId },
    Decode { name: String },
}

impl TaskKind {
    pub fn label(&self) -> String {
        match self {
            TaskKind::RemoveBackground { target } => format!("Remove background of {target}"),
            TaskKind::Decode { name } => format!("Load {name}"),
        }
    }
}

/// `Pending` moves to exactly one terminal state
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus {
    Pending,
    Succeeded,
    Failed(TaskError),
    /// The target disappeared while the task ran; the result was dropped
    Orphaned,
}

/// Outcome of a task once the editor has dealt with it
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    pub id: TaskId,
    pub kind: TaskKind,
    pub status: TaskStatus,
    /// The object the result was committed as
    pub created: Option<ObjectId>,
}

/// A finished job waiting to be applied on the owning thread
#[derive(Debug)]
pub struct TaskCompletion {
    pub id: TaskId,
    pub kind: TaskKind,
    pub result: JobResult,
}

/// The future of a single job's result.
///
/// Dropping the handle discards the result; the worker is not interrupted.
#[derive(Debug)]
pub struct JobHandle {
    receiver: oneshot::Receiver<JobResult>,
}

impl JobHandle {
    /// Non-blocking check. `None` while the job is still running.
    pub fn try_take(&mut self) -> Option<JobResult> {
        match self.receiver.try_recv() {
            Ok(result) => result,
            Err(oneshot::Canceled) => Some(Err(worker_lost())),
        }
    }
}

impl Future for JobHandle {
    type Output = JobResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|oneshot::Canceled| Err(worker_lost())))
    }
}

fn worker_lost() -> TaskError {
    TaskError::ProcessingFailed("worker exited without a result".to_owned())
}

/// Run `job` on a worker thread. The result arrives through the returned handle.
#[cfg(not(target_arch = "wasm32"))]
fn spawn_job(job: impl FnOnce() -> JobResult + Send + 'static) -> JobHandle {
    let (sender, receiver) = oneshot::channel();
    let spawned = std::thread::Builder::new()
        .name("canvas-task".to_owned())
        .spawn(move || {
            // The receiver is gone if the task timed out or the adapter was detached
            sender.send(job()).ok();
        });
    if let Err(err) = spawned {
        log::error!("Failed to spawn task worker: {err}");
    }
    JobHandle { receiver }
}

/// Browsers give us no worker thread, so `job` runs as a task on the UI thread
/// after the current frame. It blocks that thread until it returns.
#[cfg(target_arch = "wasm32")]
fn spawn_job(job: impl FnOnce() -> JobResult + 'static) -> JobHandle {
    let (sender, receiver) = oneshot::channel();
    wasm_bindgen_futures::spawn_local(async move {
        next_macrotask().await;
        sender.send(job()).ok();
    });
    JobHandle { receiver }
}

/// Resolves after the browser has had a turn to handle input and paint
#[cfg(target_arch = "wasm32")]
async fn next_macrotask() {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let scheduled = web_sys::window().is_some_and(|window| {
            window
                .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, 0)
                .is_ok()
        });
        if !scheduled {
            resolve.call0(&wasm_bindgen::JsValue::NULL).ok();
        }
    });
    wasm_bindgen_futures::JsFuture::from(promise).await.ok();
}

/// Start background removal on its own, outside any adapter
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_processing(processor: Arc<dyn ImageProcessor>, image: Arc<RasterImage>) -> JobHandle {
    spawn_job(move || processor.process(&image))
}

/// Start background removal on its own, outside any adapter.
///
/// Sliceable processors yield to the browser between slices, so the UI keeps painting.
#[cfg(target_arch = "wasm32")]
pub fn spawn_processing(processor: Arc<dyn ImageProcessor>, image: Arc<RasterImage>) -> JobHandle {
    let (sender, receiver) = oneshot::channel();
    wasm_bindgen_futures::spawn_local(async move {
        let result = processor::process_in_slices(processor.as_ref(), &image, next_macrotask).await;
        sender.send(result).ok();
    });
    JobHandle { receiver }
}

/// Start decoding an encoded image file on its own
pub fn spawn_decode(bytes: Vec<u8>) -> JobHandle {
    spawn_job(move || RasterImage::decode(&bytes))
}

struct PendingTask {
    id: TaskId,
    kind: TaskKind,
    handle: JobHandle,
    submitted_at: f64,
}

/// Runs heavy image work off the owning thread and hands results back to it.
///
/// Jobs only ever see immutable copies of their input. The scene is touched
/// solely by whoever applies the completions returned from [`TaskAdapter::poll`].
pub struct TaskAdapter {
    processor: Arc<dyn ImageProcessor>,
    pending: Vec<PendingTask>,
    recent: VecDeque<TaskReport>,
    deadline_secs: Option<f64>,
    detached: bool,
}

impl std::fmt::Debug for TaskAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskAdapter")
            .field("processor", &self.processor.name())
            .field("pending", &self.pending.len())
            .field("deadline_secs", &self.deadline_secs)
            .field("detached", &self.detached)
            .finish()
    }
}

impl TaskAdapter {
    pub fn new(processor: Arc<dyn ImageProcessor>, deadline_secs: Option<f64>) -> Self {
        Self {
            processor,
            pending: Vec::new(),
            recent: VecDeque::new(),
            deadline_secs,
            detached: false,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Validate the request against the scene and start the job
    pub fn submit(&mut self, request: TaskRequest, store: &SceneStore) -> Result<TaskId, TaskError> {
        if self.detached {
            return Err(TaskError::Detached);
        }

        let (kind, handle) = match request {
            TaskRequest::RemoveBackground { target } => {
                let object = store.get(target).ok_or(TaskError::UnknownObject(target))?;
                let shape = object.as_image().ok_or(TaskError::NotAnImage(target))?;
                let image = store.asset(shape.asset).cloned().ok_or_else(|| {
                    TaskError::ProcessingFailed(format!("pixels for {target} are missing"))
                })?;
                let handle = spawn_processing(Arc::clone(&self.processor), image);
                (TaskKind::RemoveBackground { target }, handle)
            }
            TaskRequest::Decode { bytes, name } => {
                (TaskKind::Decode { name }, spawn_decode(bytes))
            }
        };

        let id = TaskId(id_generator::next_task_id());
        log::info!("Started {id}: {}", kind.label());
        self.pending.push(PendingTask {
            id,
            kind,
            handle,
            submitted_at: time::current_time_secs(),
        });
        Ok(id)
    }

    /// Collect every job that finished or ran past the deadline.
    ///
    /// Timed-out jobs have their receivers dropped, so a late result is discarded.
    pub fn poll(&mut self) -> Vec<TaskCompletion> {
        let deadline = self.deadline_secs;
        let mut finished = Vec::new();
        self.pending.retain_mut(|task| {
            let result = match task.handle.try_take() {
                Some(result) => result,
                None => match deadline {
                    Some(limit) if time::elapsed_since(task.submitted_at) > limit => {
                        log::warn!("{} timed out after {limit:.1}s", task.id);
                        Err(TaskError::Timeout(limit))
                    }
                    _ => return true,
                },
            };
            finished.push(TaskCompletion {
                id: task.id,
                kind: task.kind.clone(),
                result,
            });
            false
        });
        finished
    }

    pub fn status(&self, id: TaskId) -> Option<TaskStatus> {
        if self.pending.iter().any(|task| task.id == id) {
            return Some(TaskStatus::Pending);
        }
        self.recent
            .iter()
            .find(|report| report.id == id)
            .map(|report| report.status.clone())
    }

    /// Remember how a completion was applied
    pub fn record(&mut self, report: TaskReport) {
        self.recent.push_back(report);
        while self.recent.len() > RECENT_REPORTS {
            self.recent.pop_front();
        }
    }

    /// Newest last
    pub fn recent(&self) -> impl Iterator<Item = &TaskReport> {
        self.recent.iter()
    }

    /// Abandon every pending job and refuse new ones
    pub fn detach(&mut self) {
        if !self.pending.is_empty() {
            log::info!("Detaching with {} pending tasks", self.pending.len());
        }
        self.pending.clear();
        self.detached = true;
    }
}

impl Drop for TaskAdapter {
    fn drop(&mut self) {
        if !self.detached {
            self.detach();
        }
    }
}
