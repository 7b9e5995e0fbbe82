mod monitor;
mod task;

use std::{fmt, sync::Arc, time::Instant};

use bulker_exec::{BuildContext, StagingArea, StrategyRouter};
use bulker_model::{RunConfig, RunReport, StatusCounts, TemplateError, ToolDefinition};
use bulker_observe::{Event, EventKind, Journal, Subscribe};
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, info, warn};

use crate::{
    cancel::{CancelReason, RunCancel},
    catalog::ToolCatalog,
    error::CoreError,
    partition, signal,
    sink::OutputSink,
    state::TaskState,
    system,
};

/// Run phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Preparing,
    Executing,
    Draining,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Preparing => "preparing",
            Phase::Executing => "executing",
            Phase::Draining => "draining",
            Phase::Done => "done",
        })
    }
}

/// Fan-out of run events to every subscriber.
#[derive(Clone)]
pub(crate) struct Events {
    subscribers: Arc<[Arc<dyn Subscribe>]>,
}

impl Events {
    fn new(subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        Self {
            subscribers: subscribers.into(),
        }
    }

    pub(crate) fn emit(&self, event: Event) {
        for sub in self.subscribers.iter() {
            sub.on_event(&event);
        }
    }
}

/// Orchestrates one run of a tool over an input file.
pub struct Runner {
    cfg: RunConfig,
    def: Arc<ToolDefinition>,
    cancel: RunCancel,
    subscribers: Vec<Arc<dyn Subscribe>>,
    router: Option<StrategyRouter>,
}

impl Runner {
    pub fn new(cfg: RunConfig, def: ToolDefinition) -> Self {
        Self {
            cfg,
            def: Arc::new(def),
            cancel: RunCancel::new(),
            subscribers: Vec::new(),
            router: None,
        }
    }

    /// Resolves `cfg.tool` in `catalog`.
    pub fn from_catalog(cfg: RunConfig, catalog: &ToolCatalog) -> Result<Self, CoreError> {
        let def = catalog.lookup(&cfg.tool)?.clone();
        Ok(Self::new(cfg, def))
    }

    /// Adds an event subscriber. Without any, events go to [`Journal`].
    pub fn with_subscriber(mut self, sub: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(sub);
        self
    }

    /// Replaces the default strategy router.
    pub fn with_router(mut self, router: StrategyRouter) -> Self {
        self.router = Some(router);
        self
    }

    /// Handle for interrupting the run from outside.
    pub fn cancel_handle(&self) -> RunCancel {
        self.cancel.clone()
    }

    pub async fn run(self) -> Result<RunReport, CoreError> {
        let Runner {
            cfg,
            def,
            cancel,
            subscribers,
            router,
        } = self;
        let started = Instant::now();
        let perf_start = system::perf_snapshot();
        let events = Events::new(if subscribers.is_empty() {
            vec![Arc::new(Journal::new()) as Arc<dyn Subscribe>]
        } else {
            subscribers
        });

        // Preparing: every setup error surfaces before a process is launched.
        debug!(phase = %Phase::Preparing, tool = %def.name, platform = system::platform(), "run phase");
        cfg.validate()?;
        let wordlist = check_wordlist(&cfg, &def)?;

        let router = router.unwrap_or_else(|| {
            let staging = StagingArea::new(&cfg.staging_dir);
            StrategyRouter::with_defaults(BuildContext::new(staging).with_wordlist(wordlist))
        });
        let strategy = router.build(def.clone())?;
        if strategy.needs_staged_input() || strategy.file_output().is_some() {
            let dir = router.context().staging.dir().to_path_buf();
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| CoreError::Staging { path: dir.clone(), source })?;
        }

        let lines: Arc<[String]> = partition::read_input(&cfg.input).await?.into();
        let tasks = partition::partition(&lines, def.mode, cfg.workers);
        let state = TaskState::new(tasks);
        events.emit(
            Event::new(EventKind::InputPartitioned)
                .with_counts(state.counts())
                .with_reason(format!(
                    "mode={} lines={} chunk_size={} workers={}",
                    def.mode,
                    lines.len(),
                    partition::chunk_size(lines.len(), cfg.workers),
                    cfg.workers
                )),
        );

        let (sink, backup_path) = OutputSink::prepare(&cfg.output, def.header()).await?;
        if let Some(backup) = &backup_path {
            events.emit(
                Event::new(EventKind::OutputBackedUp).with_line(backup.display().to_string()),
            );
        }
        let sink = Arc::new(sink);

        // Executing
        debug!(phase = %Phase::Executing, tasks = state.len(), "run phase");
        let listener = cfg.listen_for_signals.then(|| signal::listen(cancel.clone()));
        let ctx = Arc::new(task::TaskCtx {
            lines,
            args: cfg.tool_args.clone().into(),
            header: def.header().map(str::to_string),
            strategy,
            sink: sink.clone(),
            state: state.clone(),
            cancel: cancel.clone(),
            gate: Arc::new(Semaphore::new(cfg.workers)),
            events: events.clone(),
        });

        let mut set = JoinSet::new();
        for id in state.ids() {
            set.spawn(task::execute(ctx.clone(), id));
        }

        let outcome = monitor::watch(
            &state,
            &cancel,
            &events,
            &mut set,
            cfg.poll_interval,
            cfg.grace_period,
        )
        .await;

        // Draining
        debug!(phase = %Phase::Draining, grace_exceeded = outcome.grace_exceeded, "run phase");
        if outcome.grace_exceeded {
            let open = state.counts();
            // Aborted futures kill their children on drop and remove their artifacts.
            set.shutdown().await;
            state.fail_remaining("killed after grace period");
            warn!(
                count = open.total - open.finished(),
                "tasks killed after grace period"
            );
        } else {
            while set.join_next().await.is_some() {}
        }
        if let Some(listener) = listener {
            listener.abort();
        }
        drop(ctx);
        sink.close().await?;

        let report = RunReport {
            counts: state.counts(),
            peak_running: state.peak_running(),
            interrupted: cancel.is_interrupted(),
            fail_fast_task: match cancel.reason() {
                Some(CancelReason::TaskFailed(id)) => Some(id),
                _ => None,
            },
            elapsed: started.elapsed(),
            average_task_duration: state.average_duration(),
            output_path: cfg.output.clone(),
            backup_path,
            perf_start,
            perf_end: system::perf_snapshot(),
        };
        debug!(phase = %Phase::Done, "run phase");
        events.emit(Event::new(EventKind::RunFinished).with_counts(report.counts));
        if report.interrupted {
            info!(output = %report.output_path.display(), "partial output kept");
        }
        debug_assert!(is_settled(&report.counts));
        Ok(report)
    }
}

fn is_settled(counts: &StatusCounts) -> bool {
    counts.all_finished() && counts.running == 0 && counts.pending == 0
}

/// Wordlist argument for templates that reference `{wordlist}`.
fn check_wordlist(cfg: &RunConfig, def: &ToolDefinition) -> Result<Option<String>, CoreError> {
    match &cfg.wordlist {
        Some(path) => {
            if !path.is_file() {
                return Err(CoreError::Wordlist(path.clone()));
            }
            Ok(cfg.wordlist_str())
        }
        None if def.needs_wordlist() => Err(TemplateError::MissingWordlist.into()),
        None => Ok(None),
    }
}
