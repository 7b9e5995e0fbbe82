use std::time::Duration;

use bulker_observe::{Event, EventKind};
use tokio::{
    task::JoinSet,
    time::{Instant, MissedTickBehavior, interval_at, sleep_until},
};
use tracing::warn;

use crate::{cancel::RunCancel, runner::Events, state::TaskState};

#[derive(Debug, Default, Clone, Copy)]
pub(super) struct Outcome {
    pub interrupted: bool,
    pub grace_exceeded: bool,
}

/// Reports progress until every task is terminal.
///
/// After an interrupt the remaining tasks get `grace`; when it runs out the
/// monitor returns early with `grace_exceeded` and the caller aborts them.
pub(super) async fn watch(
    state: &TaskState,
    cancel: &RunCancel,
    events: &Events,
    set: &mut JoinSet<()>,
    poll: Duration,
    grace: Duration,
) -> Outcome {
    let mut ticker = interval_at(Instant::now() + poll, poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut outcome = Outcome::default();
    let mut deadline: Option<Instant> = None;
    let mut cancel_seen = false;

    loop {
        let counts = state.counts();
        if counts.all_finished() {
            break;
        }

        if deadline.is_none() && cancel.is_interrupted() {
            outcome.interrupted = true;
            deadline = Some(Instant::now() + grace);
            events.emit(Event::new(EventKind::InterruptReceived).with_counts(counts));
        }

        let grace_timer = async {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = state.changed() => {}
            _ = ticker.tick() => {
                events.emit(Event::new(EventKind::Progress).with_counts(counts));
            }
            _ = cancel.cancelled(), if !cancel_seen => {
                cancel_seen = true;
            }
            _ = grace_timer => {
                events.emit(Event::new(EventKind::GraceExceeded).with_counts(state.counts()));
                outcome.grace_exceeded = true;
                return outcome;
            }
            joined = set.join_next(), if !set.is_empty() => {
                if let Some(Err(e)) = joined
                    && e.is_panic()
                {
                    warn!(error = %e, "task panicked");
                }
            }
        }

        // Each task settles its own status, even when it panics; this only
        // guards against a future that vanished without doing so.
        if set.is_empty() && !state.counts().all_finished() {
            let orphans = state.fail_remaining("task ended without a status");
            warn!(count = orphans.len(), "tasks ended without a status");
        }
    }

    if outcome.interrupted {
        events.emit(Event::new(EventKind::AllStoppedWithinGrace));
    }
    outcome
}
