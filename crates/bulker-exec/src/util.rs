use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::trace;

pub fn cmd_program(program: &str, args: &[String]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args.iter().map(|s| s.as_str()));
    cmd
}

/// SIGTERM to the child's process group, `grace` to exit, then SIGKILL.
pub async fn kill_graceful(child: &mut Child, grace: Duration) -> std::io::Result<()> {
    cfg_if::cfg_if! {
        if #[cfg(unix)] {
            if let Some(pid) = child.id() {
                signal_group(pid, libc::SIGTERM);
                if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
                    trace!(pid, ?status, "child exited after SIGTERM");
                    return Ok(());
                }
                signal_group(pid, libc::SIGKILL);
            }
            let _ = child.kill().await;
            Ok(())
        } else {
            let _ = grace;
            child.kill().await
        }
    }
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) {
    let Ok(pgid) = i32::try_from(pid) else {
        return;
    };
    // The child leads its own group, so -pgid reaches it and its descendants.
    let rc = unsafe { libc::kill(-pgid, signal) };
    if rc != 0 {
        trace!(pid, signal, err = %std::io::Error::last_os_error(), "signal to process group failed");
    }
}
