#![cfg(unix)]

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use bulker_core::{CoreError, Runner, ToolCatalog};
use bulker_model::{RunConfig, TemplateError, ToolDefinition, ToolMode};
use bulker_observe::{EventKind, Recorder};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("stage")).unwrap();
        Self { dir }
    }

    fn input(&self, body: &str) -> PathBuf {
        let path = self.dir.path().join("input.txt");
        std::fs::write(&path, body).unwrap();
        path
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("out/result.txt")
    }

    fn stage(&self) -> PathBuf {
        self.dir.path().join("stage")
    }

    fn config(&self, tool: &str, input: &Path, workers: usize) -> RunConfig {
        RunConfig::new(tool, input.to_path_buf(), self.output())
            .with_workers(workers)
            .with_staging_dir(self.stage())
            .with_poll_interval(Duration::from_millis(50))
    }

    fn output_lines(&self) -> Vec<String> {
        std::fs::read_to_string(self.output())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn stage_is_empty(&self) -> bool {
        std::fs::read_dir(self.stage()).unwrap().next().is_none()
    }
}

fn numbered(n: usize) -> String {
    (0..n).map(|i| format!("host{i}.example\n")).collect()
}

fn sorted(mut v: Vec<String>) -> Vec<String> {
    v.sort();
    v
}

fn sh_tool(name: &str, script: &str) -> ToolDefinition {
    ToolDefinition::new(name, format!("sh -c '{script}' {{input}}"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn multiple_mode_consolidates_every_line() {
    let fx = Fixture::new();
    let input = fx.input(&numbered(10));
    let def = sh_tool("cat", r#"cat "$0""#);

    let rec = Arc::new(Recorder::new());
    let report = Runner::new(fx.config("cat", &input, 4), def)
        .with_subscriber(rec.clone())
        .run()
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.counts.total, 4);
    assert_eq!(report.counts.completed, 4);
    assert!(report.peak_running <= 4);
    assert_eq!(rec.count(EventKind::TaskStarted), 4);
    assert!(report.average_task_duration.is_some());

    let expected: Vec<String> = numbered(10).lines().map(str::to_string).collect();
    assert_eq!(sorted(fx.output_lines()), sorted(expected));
    assert!(fx.stage_is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn running_tasks_never_exceed_workers() {
    let fx = Fixture::new();
    let input = fx.input(&numbered(8));
    let def = sh_tool("slow", r#"sleep 0.2; echo "$0""#).with_mode(ToolMode::Single);

    let report = Runner::new(fx.config("slow", &input, 2), def)
        .with_subscriber(Arc::new(Recorder::new()))
        .run()
        .await
        .unwrap();

    assert_eq!(report.counts.completed, 8);
    assert!(report.peak_running >= 1 && report.peak_running <= 2);
    assert_eq!(fx.output_lines().len(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failure_cancels_pending_tasks() {
    let fx = Fixture::new();
    let input = fx.input(&numbered(5));
    let def = sh_tool("broken", r#"echo "$0"; exit 2"#).with_mode(ToolMode::Single);

    let rec = Arc::new(Recorder::new());
    let report = Runner::new(fx.config("broken", &input, 1), def)
        .with_subscriber(rec.clone())
        .run()
        .await
        .unwrap();

    assert!(!report.is_success());
    assert!(!report.interrupted);
    assert!(report.fail_fast_task.is_some());
    assert_eq!(report.counts.failed, 5);
    assert_eq!(report.counts.completed, 0);
    assert_eq!(rec.count(EventKind::TaskStarted), 1);
    assert_eq!(rec.count(EventKind::FailFast), 1);
    assert_eq!(rec.count(EventKind::TaskAbandoned), 4);
    // the failing task's stdout is kept
    let lines = fx.output_lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("host") && lines[0].ends_with(".example"));
    assert!(fx.stage_is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn invalid_utf8_output_does_not_fail_tasks() {
    let fx = Fixture::new();
    let input = fx.input(&numbered(4));
    let def = ToolDefinition::new(
        "binary",
        r#"sh -c 'printf "ok\n\377bad\nafter\n"; printf "\376\n" >&2' {input}"#,
    )
    .with_mode(ToolMode::Single);

    let rec = Arc::new(Recorder::new());
    let report = Runner::new(fx.config("binary", &input, 4), def)
        .with_subscriber(rec.clone())
        .run()
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.counts.completed, 4);
    assert!(report.fail_fast_task.is_none());
    assert_eq!(rec.count(EventKind::ToolStderr), 4);

    let lines = fx.output_lines();
    assert_eq!(lines.len(), 12);
    assert_eq!(lines.iter().filter(|l| *l == "after").count(), 4);
    assert_eq!(lines.iter().filter(|l| *l == "\u{FFFD}bad").count(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_task_output_is_complete() {
    let fx = Fixture::new();
    let input = fx.input("only\n");
    let def = sh_tool("noisy", "seq 1 50000; exit 1");

    let report = Runner::new(fx.config("noisy", &input, 1), def)
        .with_subscriber(Arc::new(Recorder::new()))
        .run()
        .await
        .unwrap();

    assert_eq!(report.counts.failed, 1);
    let lines = fx.output_lines();
    assert_eq!(lines.len(), 50000);
    assert_eq!(lines.last().map(String::as_str), Some("50000"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_output_is_spliced_with_single_header() {
    let fx = Fixture::new();
    let input = fx.input(&numbered(6));
    let def = ToolDefinition::new(
        "writer",
        r#"sh -c 'echo "url,code" > "$1"; cat "$0" >> "$1"; echo progress' {input} {output}"#,
    )
    .with_header("url,code")
    .with_file_output(&["-o"]);

    let rec = Arc::new(Recorder::new());
    let report = Runner::new(fx.config("writer", &input, 3), def)
        .with_subscriber(rec.clone())
        .run()
        .await
        .unwrap();
    assert!(report.is_success());

    let lines = fx.output_lines();
    assert_eq!(lines[0], "url,code");
    assert_eq!(lines.iter().filter(|l| *l == "url,code").count(), 1);
    assert_eq!(lines.len(), 7);
    // stdout of file-output tools goes to the console, not the sink
    assert_eq!(rec.count(EventKind::ToolStdout), 3);
    assert!(fx.stage_is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn default_output_flag_is_appended() {
    let fx = Fixture::new();
    let input = fx.input(&numbered(4));
    let def = ToolDefinition::new("flagged", r#"sh -c 'cat "$0" > "$2"' {input} {args}"#)
        .with_file_output(&["-o"]);

    let report = Runner::new(fx.config("flagged", &input, 2), def)
        .with_subscriber(Arc::new(Recorder::new()))
        .run()
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(fx.output_lines().len(), 4);
    assert!(fx.stage_is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn existing_output_is_backed_up() {
    let fx = Fixture::new();
    let input = fx.input("a\nb\n");
    std::fs::create_dir_all(fx.output().parent().unwrap()).unwrap();
    std::fs::write(fx.output(), "previous\n").unwrap();

    let report = Runner::from_catalog(fx.config("echo", &input, 1), &ToolCatalog::builtin())
        .unwrap()
        .with_subscriber(Arc::new(Recorder::new()))
        .run()
        .await
        .unwrap();

    let backup = report.backup_path.unwrap();
    assert_eq!(std::fs::read_to_string(backup).unwrap(), "previous\n");
    assert_eq!(fx.output_lines(), ["a", "b"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interrupt_drains_running_tasks_within_grace() {
    let fx = Fixture::new();
    let input = fx.input("one\ntwo\nthree\n");
    let def = sh_tool("sleeper", r#"echo "$0"; sleep 30"#).with_mode(ToolMode::Single);
    let cfg = fx
        .config("sleeper", &input, 2)
        .with_grace_period(Duration::from_secs(5));

    let rec = Arc::new(Recorder::new());
    let runner = Runner::new(cfg, def).with_subscriber(rec.clone());
    let cancel = runner.cancel_handle();

    let watcher = {
        let rec = rec.clone();
        tokio::spawn(async move {
            while rec.count(EventKind::TaskStarted) < 2 {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.interrupt();
        })
    };

    let started = std::time::Instant::now();
    let report = runner.run().await.unwrap();
    watcher.await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(report.interrupted);
    assert!(report.fail_fast_task.is_none());
    assert_eq!(report.counts.failed, 3);
    assert_eq!(report.peak_running, 2);
    assert_eq!(rec.count(EventKind::InterruptReceived), 1);
    assert_eq!(rec.count(EventKind::AllStoppedWithinGrace), 1);
    assert_eq!(rec.count(EventKind::GraceExceeded), 0);
    // lines relayed before the interrupt survive
    assert_eq!(fx.output_lines().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blank_input_yields_header_only() {
    let fx = Fixture::new();
    let input = fx.input("\n   \n\r\n");
    let def = sh_tool("cat", r#"cat "$0""#).with_header("url");

    let report = Runner::new(fx.config("cat", &input, 4), def)
        .with_subscriber(Arc::new(Recorder::new()))
        .run()
        .await
        .unwrap();

    assert_eq!(report.counts.total, 0);
    assert!(report.is_success());
    assert_eq!(std::fs::read_to_string(fx.output()).unwrap(), "url\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_wordlist_fails_before_touching_output() {
    let fx = Fixture::new();
    let input = fx.input("a\n");
    let def = ToolDefinition::new("ffuf", "ffuf -u {input} -w {wordlist}");

    let err = Runner::new(fx.config("ffuf", &input, 1), def)
        .with_subscriber(Arc::new(Recorder::new()))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoreError::Template(TemplateError::MissingWordlist)
    ));
    assert!(!fx.output().exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreadable_input_is_a_setup_error() {
    let fx = Fixture::new();
    let missing = fx.dir.path().join("missing.txt");
    let def = sh_tool("cat", r#"cat "$0""#);

    let err = Runner::new(fx.config("cat", &missing, 1), def)
        .with_subscriber(Arc::new(Recorder::new()))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Input { .. }));
    assert!(!fx.output().exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_program_fails_fast() {
    let fx = Fixture::new();
    let input = fx.input(&numbered(3));
    let def = ToolDefinition::new("ghost", "/nonexistent/bulker-ghost {input}")
        .with_mode(ToolMode::Single);

    let rec = Arc::new(Recorder::new());
    let report = Runner::new(fx.config("ghost", &input, 1), def)
        .with_subscriber(rec.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.counts.failed, 3);
    assert!(report.fail_fast_task.is_some());
    assert_eq!(rec.count(EventKind::TaskStarted), 0);
    assert!(fx.stage_is_empty());
}
