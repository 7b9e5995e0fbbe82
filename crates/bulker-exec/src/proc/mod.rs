use std::{process::Stdio, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Child,
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{
    error::ExecError,
    util::{cmd_program, kill_graceful},
};

/// Default time a child gets between SIGTERM and SIGKILL.
pub const KILL_GRACE: Duration = Duration::from_millis(500);

/// Receives the output lines of one child, in emission order per stream.
#[async_trait]
pub trait LineSink: Send + Sync {
    async fn stdout_line(&self, line: String);
    async fn stderr_line(&self, line: String);
}

/// How a supervised child finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcExit {
    pub pid: Option<u32>,
    pub stdout_lines: usize,
}

/// A launched child with piped stdout/stderr.
///
/// On Unix the child leads its own process group so terminal interrupts reach
/// only the orchestrator. Dropping an unfinished `SpawnedProc` kills the child.
#[derive(Debug)]
pub struct SpawnedProc {
    child: Child,
    pid: Option<u32>,
    kill_grace: Duration,
}

impl SpawnedProc {
    pub fn spawn(argv: &[String]) -> Result<Self, ExecError> {
        let (program, args) = argv.split_first().ok_or(ExecError::MissingProgram)?;
        if program.is_empty() {
            return Err(ExecError::MissingProgram);
        }

        let mut cmd = cmd_program(program, args);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        trace!(program = %program, ?args, "spawn");
        let child = cmd
            .spawn()
            .map_err(|e| ExecError::Spawn(format!("{program}: {e}")))?;
        let pid = child.id();

        Ok(Self {
            child,
            pid,
            kill_grace: KILL_GRACE,
        })
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Relays output to `sink` until the child exits or `cancel` fires.
    ///
    /// Any exit drains the remaining output before returning, so lines written
    /// by a failing child still reach `sink`. Cancellation stops the readers and
    /// terminates the child's process group first.
    pub async fn supervise(
        mut self,
        sink: Arc<dyn LineSink>,
        cancel: &CancellationToken,
    ) -> Result<ProcExit, ExecError> {
        let stdout = self
            .child
            .stdout
            .take()
            .ok_or_else(|| ExecError::Io("stdout not piped".into()))?;
        let stderr = self
            .child
            .stderr
            .take()
            .ok_or_else(|| ExecError::Io("stderr not piped".into()))?;

        let mut readers = Readers {
            stdout: Some(tokio::spawn(pump(stdout, sink.clone(), Stream::Stdout))),
            stderr: Some(tokio::spawn(pump(stderr, sink, Stream::Stderr))),
        };

        let status = tokio::select! {
            status = self.child.wait() => status?,
            _ = cancel.cancelled() => {
                debug!(pid = ?self.pid, "cancelled; killing child");
                let _ = kill_graceful(&mut self.child, self.kill_grace).await;
                return Err(ExecError::Cancelled);
            }
        };

        // Descendants may still hold the pipes open, so keep watching the token.
        if !status.success() {
            let failure = match status.code() {
                Some(code) => ExecError::NonZeroExit { code },
                None => ExecError::KilledBySignal,
            };
            // Lines written before the failing exit are still relayed.
            tokio::select! {
                drained = readers.drain() => {
                    if let Err(e) = drained {
                        debug!(pid = ?self.pid, error = %e, "output reader failed after non-zero exit");
                    }
                }
                _ = cancel.cancelled() => {}
            }
            return Err(failure);
        }

        let stdout_lines = tokio::select! {
            drained = readers.drain() => drained?,
            _ = cancel.cancelled() => return Err(ExecError::Cancelled),
        };
        trace!(pid = ?self.pid, stdout_lines, "exit success");

        Ok(ProcExit {
            pid: self.pid,
            stdout_lines,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

async fn pump<R>(reader: R, sink: Arc<dyn LineSink>, stream: Stream) -> Result<usize, ExecError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut count = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let raw = buf.strip_suffix(b"\n").unwrap_or(&buf);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        // Tool output is opaque bytes; invalid UTF-8 is replaced, never fatal.
        let line = String::from_utf8_lossy(raw).into_owned();
        count += 1;
        match stream {
            Stream::Stdout => sink.stdout_line(line).await,
            Stream::Stderr => sink.stderr_line(line).await,
        }
    }
    Ok(count)
}

/// Reader tasks, aborted on drop unless drained.
struct Readers {
    stdout: Option<JoinHandle<Result<usize, ExecError>>>,
    stderr: Option<JoinHandle<Result<usize, ExecError>>>,
}

impl Readers {
    async fn drain(&mut self) -> Result<usize, ExecError> {
        let mut stdout_lines = 0;
        if let Some(handle) = self.stdout.take() {
            stdout_lines = join(handle).await?;
        }
        if let Some(handle) = self.stderr.take() {
            join(handle).await?;
        }
        Ok(stdout_lines)
    }
}

async fn join(handle: JoinHandle<Result<usize, ExecError>>) -> Result<usize, ExecError> {
    handle
        .await
        .map_err(|e| ExecError::Io(format!("output reader: {e}")))?
}

impl Drop for Readers {
    fn drop(&mut self) {
        for handle in [self.stdout.take(), self.stderr.take()].into_iter().flatten() {
            handle.abort();
        }
    }
}
