mod bus;
mod events;
mod handlers;

pub use bus::EventBus;
pub use events::{EditorEvent, Notice, NoticeLevel};
pub use handlers::{LogEventHandler, NoticeQueue};

pub trait EventHandler: Send {
    fn handle_event(&mut self, event: &EditorEvent);
}
