//! Input reading and task partitioning.
use bulker_model::{InputSource, LineRange, Task, TaskId, TaskPayload, ToolMode};
use tokio::io::AsyncReadExt;

use crate::error::CoreError;

/// Reads every non-blank line of `source`.
pub async fn read_input(source: &InputSource) -> Result<Vec<String>, CoreError> {
    let raw = match source {
        InputSource::File(path) => {
            tokio::fs::read(path)
                .await
                .map_err(|source| CoreError::Input {
                    input: path.display().to_string(),
                    source,
                })?
        }
        InputSource::Stdin => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .map_err(|source| CoreError::Input {
                    input: "<stdin>".into(),
                    source,
                })?;
            buf
        }
    };
    Ok(parse_lines(&String::from_utf8_lossy(&raw)))
}

/// Splits on `\n`, strips a trailing `\r` and drops blank lines.
pub fn parse_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// `max(1, ceil(total / workers))`.
pub fn chunk_size(total: usize, workers: usize) -> usize {
    total.div_ceil(workers.max(1)).max(1)
}

/// Builds the task list for `lines` in ascending order.
///
/// Multiple mode yields contiguous ranges of `chunk_size` lines (the last may be
/// shorter); single mode yields one task per line.
pub fn partition(lines: &[String], mode: ToolMode, workers: usize) -> Vec<Task> {
    match mode {
        ToolMode::Single => lines
            .iter()
            .enumerate()
            .map(|(index, line)| {
                Task::new(
                    TaskId::new(index),
                    TaskPayload::Line {
                        index,
                        line: line.clone(),
                    },
                )
            })
            .collect(),
        ToolMode::Multiple => {
            let size = chunk_size(lines.len(), workers);
            (0..lines.len())
                .step_by(size)
                .enumerate()
                .map(|(id, start)| {
                    let range = LineRange::new(start, (start + size).min(lines.len()));
                    Task::new(TaskId::new(id), TaskPayload::Range(range))
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("line{i}")).collect()
    }

    fn ranges(tasks: &[Task]) -> Vec<String> {
        tasks.iter().map(|t| t.payload.to_string()).collect()
    }

    #[test]
    fn ten_lines_four_workers() {
        let tasks = partition(&lines(10), ToolMode::Multiple, 4);
        assert_eq!(
            ranges(&tasks),
            ["lines_0_2", "lines_3_5", "lines_6_8", "lines_9_9"]
        );
        assert_eq!(tasks[3].label, "worker_3");
    }

    #[test]
    fn multiple_mode_covers_every_line_once() {
        for total in 0..40 {
            for workers in 1..9 {
                let tasks = partition(&lines(total), ToolMode::Multiple, workers);
                assert!(tasks.len() <= workers.max(1));
                assert_eq!(tasks.len(), total.div_ceil(chunk_size(total, workers)));

                let mut next = 0;
                for task in &tasks {
                    let range = task.payload.range();
                    assert_eq!(range.start(), next);
                    assert!(!range.is_empty());
                    next = range.end();
                }
                assert_eq!(next, total);
            }
        }
    }

    #[test]
    fn fewer_lines_than_workers() {
        assert_eq!(chunk_size(3, 8), 1);
        assert_eq!(partition(&lines(3), ToolMode::Multiple, 8).len(), 3);
    }

    #[test]
    fn single_mode_keeps_order() {
        let tasks = partition(&lines(3), ToolMode::Single, 2);
        assert_eq!(ranges(&tasks), ["line0", "line1", "line2"]);
        assert_eq!(tasks[2].payload.range(), LineRange::single(2));
    }

    #[test]
    fn empty_input_has_no_tasks() {
        assert!(partition(&[], ToolMode::Multiple, 4).is_empty());
        assert!(partition(&[], ToolMode::Single, 4).is_empty());
    }

    #[test]
    fn blank_lines_and_carriage_returns_are_dropped() {
        let parsed = parse_lines("a.com\r\n\r\n   \nb.com\n\tc.com \n");
        assert_eq!(parsed, ["a.com", "b.com", "\tc.com "]);
    }

    #[tokio::test]
    async fn reads_file_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.txt");
        std::fs::write(&path, "x\n\ny\n").unwrap();

        let got = read_input(&InputSource::File(path)).await.unwrap();
        assert_eq!(got, ["x", "y"]);

        let missing = read_input(&InputSource::File(dir.path().join("nope"))).await;
        assert!(matches!(missing, Err(CoreError::Input { .. })));
    }
}
