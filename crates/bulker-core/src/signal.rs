use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cancel::RunCancel;

/// Turns SIGINT/SIGTERM into an interrupt of `cancel`.
///
/// Later signals are only logged; abort the handle when the run ends.
pub(crate) fn listen(cancel: RunCancel) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut signals = match Signals::new() {
            Ok(signals) => signals,
            Err(e) => {
                warn!(error = %e, "cannot install signal handlers; interrupts will not drain");
                return;
            }
        };

        loop {
            if let Err(e) = signals.recv().await {
                warn!(error = %e, "signal listener stopped");
                return;
            }
            if cancel.interrupt() {
                debug!("interrupt signal delivered");
            } else {
                warn!("interrupt already in progress; waiting for running tasks");
            }
        }
    })
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        use tokio::signal::unix::{Signal, SignalKind, signal};

        struct Signals {
            int: Signal,
            term: Signal,
        }

        impl Signals {
            fn new() -> std::io::Result<Self> {
                Ok(Self {
                    int: signal(SignalKind::interrupt())?,
                    term: signal(SignalKind::terminate())?,
                })
            }

            async fn recv(&mut self) -> std::io::Result<()> {
                let got = tokio::select! {
                    got = self.int.recv() => got,
                    got = self.term.recv() => got,
                };
                got.ok_or_else(|| std::io::Error::other("signal stream closed"))
            }
        }
    } else {
        struct Signals;

        impl Signals {
            fn new() -> std::io::Result<Self> {
                Ok(Self)
            }

            async fn recv(&mut self) -> std::io::Result<()> {
                tokio::signal::ctrl_c().await
            }
        }
    }
}
