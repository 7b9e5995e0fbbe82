use serde::{Deserialize, Serialize};

/// Lifecycle state of a single task.
///
/// Transitions only move forward:
/// `Pending -> Running -> {Completed | Failed}` or `Pending -> Failed`
/// for tasks abandoned before they got an admission slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    /// Created by the partitioner, waiting for an admission slot.
    Pending,
    /// Holding a slot; the external process is being prepared or is running.
    Running,
    /// Process exited with status zero and its output was consolidated.
    Completed,
    /// Staging, launch or execution failed, or the task was cancelled.
    Failed,
}

impl TaskStatus {
    /// Returns `true` if the task is in a terminal state (won't transition further).
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Returns `true` if the task is still active (pending or running).
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }

    /// Whether `self -> next` is an allowed forward transition.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Pending, TaskStatus::Failed)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
        )
    }
}
