use bulker_model::{PerfSnapshot, RunReport};
use tracing::{error, info, warn};

/// End-of-run summary: outcome, timing and process counters.
pub fn log_report(report: &RunReport) {
    let c = &report.counts;
    let output = report.output_path.display().to_string();

    if report.interrupted {
        warn!(
            completed = c.completed,
            failed = c.failed,
            total = c.total,
            output = %output,
            "run interrupted; partial results kept"
        );
    } else if c.failed > 0 {
        error!(
            completed = c.completed,
            failed = c.failed,
            total = c.total,
            failed_first = %report.fail_fast_task.map(|t| t.label()).unwrap_or_default(),
            output = %output,
            "run finished with failures"
        );
    } else {
        info!(
            completed = c.completed,
            total = c.total,
            output = %output,
            "run finished"
        );
    }

    if let Some(backup) = &report.backup_path {
        info!(backup = %backup.display(), "previous output kept as backup");
    }

    info!(
        elapsed_ms = report.elapsed.as_millis() as u64,
        avg_task_ms = report
            .average_task_duration
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0),
        peak_running = report.peak_running,
        "timing"
    );
    log_perf("start", &report.perf_start);
    log_perf("end", &report.perf_end);
}

fn log_perf(at: &str, perf: &PerfSnapshot) {
    info!(
        at,
        rss_kib = perf.rss_kib.unwrap_or(0),
        os_threads = perf.os_threads.unwrap_or(0),
        runtime_workers = perf.runtime_workers,
        "process counters"
    );
}
