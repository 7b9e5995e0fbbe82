use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of a task in the partition order.
///
/// Ids are dense and start at zero, so they double as indices into the
/// orchestrator's task table and as the collision-free component of the
/// per-task temporary file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(usize);

impl TaskId {
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Default label used in console output (`worker_<id>`).
    pub fn label(self) -> String {
        format!("worker_{}", self.0)
    }
}

impl From<usize> for TaskId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
