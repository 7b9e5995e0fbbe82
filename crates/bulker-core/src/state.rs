use std::{
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::{Duration, Instant},
};

use bulker_model::{StatusCounts, Task, TaskId, TaskStatus};
use tokio::sync::Notify;

/// Shared task table of one run.
///
/// Every status change goes through here; transitions that would move a task
/// backwards or out of a terminal state are refused.
#[derive(Clone)]
pub struct TaskState {
    inner: Arc<RwLock<TaskStateInner>>,
    changed: Arc<Notify>,
}

struct TaskStateInner {
    /// Indexed by `TaskId::index()`.
    tasks: Vec<Task>,
    running: usize,
    peak_running: usize,
}

impl TaskState {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TaskStateInner {
                tasks,
                running: 0,
                peak_running: 0,
            })),
            changed: Arc::new(Notify::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, TaskStateInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, TaskStateInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// `Pending -> Running`. Returns `false` if the task was not pending.
    pub fn mark_running(&self, id: TaskId) -> bool {
        let mut inner = self.write();
        let Some(task) = inner.tasks.get_mut(id.index()) else {
            return false;
        };
        if !task.status.can_transition_to(TaskStatus::Running) {
            return false;
        }
        task.status = TaskStatus::Running;
        task.started_at = Some(Instant::now());

        inner.running += 1;
        inner.peak_running = inner.peak_running.max(inner.running);
        true
    }

    /// Process id of the launched child.
    pub fn set_pid(&self, id: TaskId, pid: Option<u32>) {
        if let Some(task) = self.write().tasks.get_mut(id.index()) {
            task.pid = pid;
        }
    }

    /// Moves a task into a terminal state and stamps `ended_at` once.
    ///
    /// Returns `false` when the task is unknown or already terminal.
    pub fn finish(&self, id: TaskId, status: TaskStatus, error: Option<String>) -> bool {
        debug_assert!(status.is_terminal());
        let mut inner = self.write();
        let Some(task) = inner.tasks.get_mut(id.index()) else {
            return false;
        };
        if !task.status.can_transition_to(status) {
            return false;
        }
        let was_running = task.status == TaskStatus::Running;

        task.status = status;
        task.ended_at = Some(Instant::now());
        if error.is_some() {
            task.error = error;
        }
        if was_running {
            inner.running -= 1;
        }
        drop(inner);

        self.changed.notify_one();
        true
    }

    /// Fails every task that is not terminal yet; returns their ids.
    pub fn fail_remaining(&self, reason: &str) -> Vec<TaskId> {
        let ids: Vec<TaskId> = self
            .read()
            .tasks
            .iter()
            .filter(|t| !t.status.is_terminal())
            .map(|t| t.id)
            .collect();
        ids.into_iter()
            .filter(|id| self.finish(*id, TaskStatus::Failed, Some(reason.to_string())))
            .collect()
    }

    /// Resolves after the next terminal transition.
    pub async fn changed(&self) {
        self.changed.notified().await
    }

    pub fn get(&self, id: TaskId) -> Option<Task> {
        self.read().tasks.get(id.index()).cloned()
    }

    pub fn ids(&self) -> Vec<TaskId> {
        self.read().tasks.iter().map(|t| t.id).collect()
    }

    pub fn len(&self) -> usize {
        self.read().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts(&self) -> StatusCounts {
        let inner = self.read();
        let mut counts = StatusCounts {
            total: inner.tasks.len(),
            ..StatusCounts::default()
        };
        for task in &inner.tasks {
            match task.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::Running => counts.running += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Highest number of simultaneously running tasks so far.
    pub fn peak_running(&self) -> usize {
        self.read().peak_running
    }

    /// Mean duration of tasks that ran to a terminal state.
    pub fn average_duration(&self) -> Option<Duration> {
        let inner = self.read();
        let (sum, n) = inner
            .tasks
            .iter()
            .filter_map(Task::duration)
            .fold((Duration::ZERO, 0u32), |(sum, n), d| (sum + d, n + 1));
        (n > 0).then(|| sum / n)
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.read().tasks.clone()
    }
}
