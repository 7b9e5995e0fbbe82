use std::{path::PathBuf, time::Duration};

use serde::Serialize;

use crate::TaskId;

/// Aggregate status counts at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StatusCounts {
    /// Tasks that reached `Completed` or `Failed`.
    #[inline]
    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }

    /// `completed + failed == total`.
    #[inline]
    pub fn all_finished(&self) -> bool {
        self.finished() == self.total
    }
}

/// Process-wide counters sampled at run start and run end.
///
/// Pure observation: nothing in the scheduler reads these values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PerfSnapshot {
    /// Resident set size in KiB, when the platform exposes it.
    pub rss_kib: Option<u64>,
    /// OS threads of this process, when the platform exposes it.
    pub os_threads: Option<u64>,
    /// Worker threads of the async runtime.
    pub runtime_workers: usize,
}

/// Outcome of one orchestration run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub counts: StatusCounts,
    /// Highest number of tasks observed in `Running` at the same time.
    pub peak_running: usize,
    /// Run was cut short by an operator interrupt.
    pub interrupted: bool,
    /// Task whose execution failure triggered fail-fast cancellation.
    pub fail_fast_task: Option<TaskId>,
    pub elapsed: Duration,
    pub average_task_duration: Option<Duration>,
    pub output_path: PathBuf,
    /// Where a pre-existing output file was moved before the run.
    pub backup_path: Option<PathBuf>,
    pub perf_start: PerfSnapshot,
    pub perf_end: PerfSnapshot,
}

impl RunReport {
    /// No task failed and the run was not interrupted.
    pub fn is_success(&self) -> bool {
        !self.interrupted && self.counts.failed == 0
    }
}
