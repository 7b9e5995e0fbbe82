use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use bulker_exec::{ExecError, InputHandle, LineSink, SpawnedProc, ToolStrategy};
use bulker_model::{LineRange, TaskId, TaskStatus};
use bulker_observe::{Event, EventKind};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::{
    cancel::{CancelReason, RunCancel},
    runner::Events,
    sink::OutputSink,
    state::TaskState,
};

/// Everything a task needs, shared by all tasks of a run.
pub(crate) struct TaskCtx {
    pub lines: Arc<[String]>,
    pub args: Arc<[String]>,
    pub header: Option<String>,
    pub strategy: Arc<dyn ToolStrategy>,
    pub sink: Arc<OutputSink>,
    pub state: TaskState,
    pub cancel: RunCancel,
    pub gate: Arc<Semaphore>,
    pub events: Events,
}

/// Runs one task from admission to its terminal state.
pub(crate) async fn execute(ctx: Arc<TaskCtx>, id: TaskId) {
    let _settle = Settle {
        state: ctx.state.clone(),
        id,
    };

    let permit = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => None,
        permit = ctx.gate.clone().acquire_owned() => permit.ok(),
    };
    let Some(_permit) = permit.filter(|_| !ctx.cancel.is_cancelled()) else {
        if ctx
            .state
            .finish(id, TaskStatus::Failed, Some("cancelled before start".into()))
        {
            ctx.events.emit(
                Event::new(EventKind::TaskAbandoned)
                    .with_task(id)
                    .with_reason("cancelled before start"),
            );
        }
        return;
    };

    if !ctx.state.mark_running(id) {
        return;
    }
    let Some(range) = ctx.state.get(id).map(|t| t.payload.range()) else {
        return;
    };

    let mut artifacts = Artifacts::default();
    let result = launch(&ctx, id, range, &mut artifacts).await;

    if let Err(e) = &result
        && e.is_execution_failure()
        && ctx.cancel.trigger(CancelReason::TaskFailed(id))
    {
        ctx.events.emit(
            Event::new(EventKind::FailFast)
                .with_task(id)
                .with_reason(e.to_string()),
        );
    }

    // Splice and cleanup finish before the status is published, so the sink
    // is never closed under a pending splice.
    artifacts.settle(&ctx, id).await;

    match result {
        Ok(()) => {
            if ctx.state.finish(id, TaskStatus::Completed, None) {
                ctx.events.emit(
                    Event::new(EventKind::TaskCompleted)
                        .with_task(id)
                        .with_duration(duration(&ctx.state, id)),
                );
            }
        }
        Err(e) => {
            let reason = e.to_string();
            if ctx.state.finish(id, TaskStatus::Failed, Some(reason.clone())) {
                ctx.events.emit(
                    Event::new(EventKind::TaskFailed)
                        .with_task(id)
                        .with_reason(reason)
                        .with_duration(duration(&ctx.state, id)),
                );
            }
        }
    }
}

async fn launch(
    ctx: &TaskCtx,
    id: TaskId,
    range: LineRange,
    artifacts: &mut Artifacts,
) -> Result<(), ExecError> {
    let input = ctx
        .strategy
        .prepare_input(range.slice(&ctx.lines[..]), id, range)
        .await?;
    artifacts.input = Some(input.clone());

    let file_output = ctx
        .strategy
        .file_output()
        .filter(|fo| fo.handles_file_output(&ctx.args));
    let argv = match file_output {
        Some(fo) => {
            let (argv, temp) = fo.build_command_with_file_output(&input, &ctx.args, id)?;
            artifacts.temp = Some(temp);
            argv
        }
        None => ctx.strategy.build_command(&input, &ctx.args)?,
    };

    if ctx.cancel.is_cancelled() {
        return Err(ExecError::Cancelled);
    }
    let proc = SpawnedProc::spawn(&argv)?;
    ctx.state.set_pid(id, proc.pid());
    ctx.events.emit(
        Event::new(EventKind::TaskStarted)
            .with_task(id)
            .with_pid(proc.pid()),
    );

    let lines = Arc::new(TaskLines {
        id,
        sink: ctx.sink.clone(),
        events: ctx.events.clone(),
        to_output: artifacts.temp.is_none(),
    });
    let exit = proc.supervise(lines, ctx.cancel.token()).await?;
    debug!(task = %id.label(), stdout_lines = exit.stdout_lines, "process exited cleanly");
    Ok(())
}

fn duration(state: &TaskState, id: TaskId) -> Option<std::time::Duration> {
    state.get(id).and_then(|t| t.duration())
}

/// Fails the task if its future is dropped before reaching a terminal state.
struct Settle {
    state: TaskState,
    id: TaskId,
}

impl Drop for Settle {
    fn drop(&mut self) {
        self.state
            .finish(self.id, TaskStatus::Failed, Some("task aborted".into()));
    }
}

/// Per-task files; removed on drop if `settle` never ran.
#[derive(Default)]
struct Artifacts {
    input: Option<InputHandle>,
    temp: Option<PathBuf>,
}

impl Artifacts {
    async fn settle(&mut self, ctx: &TaskCtx, id: TaskId) {
        if let Some(temp) = self.temp.take() {
            splice(ctx, id, &temp).await;
            if let Err(e) = tokio::fs::remove_file(&temp).await
                && e.kind() != std::io::ErrorKind::NotFound
            {
                cleanup_failed(ctx, id, &temp, &e.to_string());
            }
        }
        if let Some(input) = self.input.take()
            && let Err(e) = ctx.strategy.cleanup(&input).await
        {
            let path = input
                .staged_path()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            cleanup_failed(ctx, id, &path, &e.to_string());
        }
    }
}

impl Drop for Artifacts {
    fn drop(&mut self) {
        if let Some(temp) = self.temp.take() {
            let _ = std::fs::remove_file(temp);
        }
        if let Some(InputHandle::Staged(path)) = self.input.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Appends a tool-managed output file to the sink.
///
/// NUL bytes are stripped and a leading line equal to the header is dropped,
/// so the consolidated file keeps exactly one header.
async fn splice(ctx: &TaskCtx, id: TaskId, temp: &Path) {
    let raw = match tokio::fs::read(temp).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(task = %id.label(), path = %temp.display(), "tool wrote no output file");
            return;
        }
        Err(e) => {
            cleanup_failed(ctx, id, temp, &e.to_string());
            return;
        }
    };

    let text = String::from_utf8_lossy(&raw).replace('\0', "");
    let body = strip_header(&text, ctx.header.as_deref());
    if let Err(e) = ctx.sink.append(body).await {
        cleanup_failed(ctx, id, temp, &e.to_string());
    }
}

pub(crate) fn strip_header<'a>(text: &'a str, header: Option<&str>) -> &'a str {
    let Some(header) = header else {
        return text;
    };
    let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
    if first.trim_end_matches('\r') == header {
        rest
    } else {
        text
    }
}

fn cleanup_failed(ctx: &TaskCtx, id: TaskId, path: &Path, reason: &str) {
    ctx.events.emit(
        Event::new(EventKind::CleanupFailed)
            .with_task(id)
            .with_line(path.display().to_string())
            .with_reason(reason),
    );
}

/// Routes a child's output: stdout to the sink (or the console for
/// file-output tools), stderr to the console.
struct TaskLines {
    id: TaskId,
    sink: Arc<OutputSink>,
    events: Events,
    to_output: bool,
}

#[async_trait]
impl LineSink for TaskLines {
    async fn stdout_line(&self, line: String) {
        if self.to_output {
            if let Err(e) = self.sink.append(&line).await {
                warn!(task = %self.id.label(), error = %e, "output write failed");
            }
        } else {
            self.events.emit(
                Event::new(EventKind::ToolStdout)
                    .with_task(self.id)
                    .with_line(line),
            );
        }
    }

    async fn stderr_line(&self, line: String) {
        self.events.emit(
            Event::new(EventKind::ToolStderr)
                .with_task(self.id)
                .with_line(line),
        );
    }
}
