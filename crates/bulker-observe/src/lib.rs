mod logger;
pub use logger::*;

mod event;
pub use event::{Event, EventKind, message_for};

mod subscriber;
pub use subscriber::{Journal, Recorder, Subscribe};

mod report;
pub use report::log_report;
