use crate::element::ObjectId;
use crate::tasks::{TaskId, TaskStatus};
use crate::tools::ToolId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A short message meant for the user
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, message)
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, message)
    }

    fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    ToolChanged {
        old: ToolId,
        new: ToolId,
    },
    SelectionChanged(Option<ObjectId>),
    /// A command was executed; `version` is the store's new modification count
    SceneChanged {
        label: &'static str,
        version: u64,
    },
    HistoryCaptured {
        sequence: u64,
        entries: usize,
    },
    HistoryUndone {
        sequence: u64,
        entries: usize,
    },
    TaskStarted {
        id: TaskId,
    },
    TaskFinished {
        id: TaskId,
        status: TaskStatus,
    },
    Notice(Notice),
}
