mod task_id;
pub use task_id::TaskId;

mod task_status;
pub use task_status::TaskStatus;

mod line_range;
pub use line_range::LineRange;

mod task;
pub use task::{Task, TaskPayload};

mod summary;
pub use summary::{PerfSnapshot, RunReport, StatusCounts};

/// Cosmetic, per-task unique label shown next to log lines.
pub type Label = String;
