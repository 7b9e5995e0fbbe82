use std::{
    fmt,
    time::{Duration, Instant},
};

use crate::{Label, LineRange, TaskId, TaskStatus};

/// What a task works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPayload {
    /// One raw input line (single mode). `index` points into the input buffer.
    Line { index: usize, line: String },
    /// A contiguous range of input lines (multiple mode), resolved against
    /// the shared input buffer when the task executes.
    Range(LineRange),
}

impl TaskPayload {
    /// Lines covered by this payload.
    pub fn range(&self) -> LineRange {
        match self {
            TaskPayload::Line { index, .. } => LineRange::single(*index),
            TaskPayload::Range(range) => *range,
        }
    }
}

impl fmt::Display for TaskPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPayload::Line { line, .. } => f.write_str(line),
            TaskPayload::Range(range) => range.fmt(f),
        }
    }
}

/// One unit of work: a single external-process invocation.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub payload: TaskPayload,
    pub label: Label,
    pub status: TaskStatus,
    /// Set on `Pending -> Running`.
    pub started_at: Option<Instant>,
    /// Set exactly once, on entry into a terminal state.
    pub ended_at: Option<Instant>,
    /// Process id, present once a child process was launched.
    pub pid: Option<u32>,
    /// Failure reason for `Failed` tasks.
    pub error: Option<String>,
}

impl Task {
    pub fn new(id: TaskId, payload: TaskPayload) -> Self {
        Self {
            id,
            payload,
            label: id.label(),
            status: TaskStatus::Pending,
            started_at: None,
            ended_at: None,
            pid: None,
            error: None,
        }
    }

    /// Time spent between admission and the terminal transition.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(end.saturating_duration_since(start)),
            _ => None,
        }
    }

    /// Whether a child process was ever launched for this task.
    pub fn launched(&self) -> bool {
        self.pid.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_is_pending_with_worker_label() {
        let task = Task::new(TaskId::new(4), TaskPayload::Range(LineRange::new(0, 3)));
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.label, "worker_4");
        assert_eq!(task.payload.to_string(), "lines_0_2");
        assert!(task.duration().is_none());
        assert!(!task.launched());
    }

    #[test]
    fn line_payload_covers_its_own_index() {
        let payload = TaskPayload::Line {
            index: 7,
            line: "example.com".into(),
        };
        assert_eq!(payload.range(), LineRange::single(7));
        assert_eq!(payload.to_string(), "example.com");
    }
}
