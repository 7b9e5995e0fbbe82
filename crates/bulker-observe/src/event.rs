use std::time::Duration;

use bulker_model::{StatusCounts, TaskId};
use tracing::{debug, error, info, trace, warn};

/// What happened during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // setup
    OutputBackedUp,
    InputPartitioned,

    // lifecycle
    TaskStarted,
    TaskCompleted,
    TaskFailed,
    TaskAbandoned,
    ToolStdout,
    ToolStderr,
    CleanupFailed,

    // run
    Progress,
    FailFast,
    InterruptReceived,
    AllStoppedWithinGrace,
    GraceExceeded,
    RunFinished,
}

/// One run event with the fields relevant to its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub task: Option<TaskId>,
    pub pid: Option<u32>,
    pub reason: Option<String>,
    pub line: Option<String>,
    pub duration: Option<Duration>,
    pub counts: Option<StatusCounts>,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            task: None,
            pid: None,
            reason: None,
            line: None,
            duration: None,
            counts: None,
        }
    }

    pub fn with_task(mut self, task: TaskId) -> Self {
        self.task = Some(task);
        self
    }

    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.line = Some(line.into());
        self
    }

    pub fn with_duration(mut self, duration: Option<Duration>) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_counts(mut self, counts: StatusCounts) -> Self {
        self.counts = Some(counts);
        self
    }

    #[inline]
    fn as_task(&self) -> String {
        self.task.map(|t| t.label()).unwrap_or_else(|| "run".into())
    }

    #[inline]
    fn as_reason(&self) -> &str {
        self.reason.as_deref().unwrap_or("unknown")
    }

    #[inline]
    fn as_line(&self) -> &str {
        self.line.as_deref().unwrap_or_default()
    }

    #[inline]
    fn duration_ms(&self) -> u64 {
        self.duration.map(|d| d.as_millis() as u64).unwrap_or(0)
    }

    #[inline]
    fn counts(&self) -> StatusCounts {
        self.counts.unwrap_or_default()
    }

    /// Writes the event through `tracing` at the level its kind calls for.
    pub fn log(&self) {
        let msg = message_for(self.kind);

        match self.kind {
            // setup
            EventKind::OutputBackedUp => info!(path = self.as_line(), "{msg}"),
            EventKind::InputPartitioned => {
                let c = self.counts();
                info!(tasks = c.total, detail = self.as_reason(), "{msg}")
            }

            // lifecycle
            EventKind::TaskStarted => match self.pid {
                Some(pid) => info!(task = %self.as_task(), pid, "{msg}"),
                None => info!(task = %self.as_task(), "{msg}"),
            },
            EventKind::TaskCompleted => {
                info!(task = %self.as_task(), duration_ms = self.duration_ms(), "{msg}")
            }
            EventKind::TaskFailed => error!(
                task = %self.as_task(),
                duration_ms = self.duration_ms(),
                reason = self.as_reason(),
                "{msg}"
            ),
            EventKind::TaskAbandoned => {
                debug!(task = %self.as_task(), reason = self.as_reason(), "{msg}")
            }
            EventKind::ToolStdout => info!(task = %self.as_task(), "{}", self.as_line()),
            EventKind::ToolStderr => warn!(task = %self.as_task(), "{}", self.as_line()),
            EventKind::CleanupFailed => warn!(
                task = %self.as_task(),
                path = self.as_line(),
                reason = self.as_reason(),
                "{msg}"
            ),

            // run
            EventKind::Progress => {
                let c = self.counts();
                info!(
                    completed = c.completed,
                    failed = c.failed,
                    running = c.running,
                    pending = c.pending,
                    total = c.total,
                    "{msg}"
                )
            }
            EventKind::FailFast => {
                error!(task = %self.as_task(), reason = self.as_reason(), "{msg}")
            }
            EventKind::InterruptReceived => warn!("{msg}"),
            EventKind::AllStoppedWithinGrace => info!("{msg}"),
            EventKind::GraceExceeded => {
                let c = self.counts();
                warn!(running = c.running, "{msg}")
            }
            EventKind::RunFinished => trace!("{msg}"),
        }
    }
}

#[inline]
pub fn message_for(kind: EventKind) -> &'static str {
    match kind {
        // setup
        EventKind::OutputBackedUp => "existing output moved aside",
        EventKind::InputPartitioned => "input partitioned into tasks",

        // lifecycle
        EventKind::TaskStarted => "task started",
        EventKind::TaskCompleted => "task completed",
        EventKind::TaskFailed => "task failed",
        EventKind::TaskAbandoned => "task abandoned before launch",
        EventKind::ToolStdout => "tool stdout",
        EventKind::ToolStderr => "tool stderr",
        EventKind::CleanupFailed => "cleanup of task artifact failed",

        // run
        EventKind::Progress => "progress",
        EventKind::FailFast => "task failure cancels the run; no new tasks will start",
        EventKind::InterruptReceived => "interrupt received; waiting for running tasks",
        EventKind::AllStoppedWithinGrace => "all tasks stopped within grace period",
        EventKind::GraceExceeded => "grace exceeded; remaining tasks are being killed",
        EventKind::RunFinished => "run finished",
    }
}
