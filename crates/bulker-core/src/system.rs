//! Process-wide counters for the end-of-run summary.
use std::fs;

use bulker_model::PerfSnapshot;

/// Samples memory and thread counters of this process.
///
/// Must be called from within a tokio runtime.
pub fn perf_snapshot() -> PerfSnapshot {
    let (rss_kib, os_threads) = proc_status();
    PerfSnapshot {
        rss_kib,
        os_threads,
        runtime_workers: tokio::runtime::Handle::try_current()
            .map(|h| h.metrics().num_workers())
            .unwrap_or(0),
    }
}

/// Get platform (OS family).
#[inline]
pub fn platform() -> &'static str {
    std::env::consts::OS
}

/// `VmRSS` and `Threads` from `/proc/self/status` (Linux only, best effort).
fn proc_status() -> (Option<u64>, Option<u64>) {
    #[cfg(target_os = "linux")]
    {
        if let Ok(content) = fs::read_to_string("/proc/self/status") {
            return parse_status(&content);
        }
    }
    (None, None)
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_status(content: &str) -> (Option<u64>, Option<u64>) {
    let mut rss = None;
    let mut threads = None;
    for line in content.lines() {
        if let Some(v) = line.strip_prefix("VmRSS:") {
            rss = v.split_whitespace().next().and_then(|n| n.parse().ok());
        } else if let Some(v) = line.strip_prefix("Threads:") {
            threads = v.trim().parse().ok();
        }
    }
    (rss, threads)
}
