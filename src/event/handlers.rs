use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::event::{EditorEvent, EventHandler, Notice};

// Older notices are dropped once the queue is this long
const MAX_NOTICES: usize = 16;

/// Collects user-facing notices for the UI to drain each frame.
///
/// Clones share the same queue, so one clone can be subscribed to the bus while
/// the app keeps another.
#[derive(Debug, Clone, Default)]
pub struct NoticeQueue {
    notices: Arc<Mutex<VecDeque<Notice>>>,
}

impl NoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, notice: Notice) {
        let mut notices = self.notices.lock();
        notices.push_back(notice);
        while notices.len() > MAX_NOTICES {
            notices.pop_front();
        }
    }

    pub fn drain(&self) -> Vec<Notice> {
        self.notices.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.notices.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.lock().is_empty()
    }
}

impl EventHandler for NoticeQueue {
    fn handle_event(&mut self, event: &EditorEvent) {
        if let EditorEvent::Notice(notice) = event {
            self.push(notice.clone());
        }
    }
}

/// Mirrors every event to the `log` facade at debug level
#[derive(Debug, Default)]
pub struct LogEventHandler;

impl EventHandler for LogEventHandler {
    fn handle_event(&mut self, event: &EditorEvent) {
        log::debug!("Event: {event:?}");
    }
}
