use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use bulker_model::{LineRange, TaskId, ToolDefinition, rewrite_output_flags, strip_flags};
use tracing::trace;

use crate::{
    error::ExecError,
    strategy::{FileOutputStrategy, InputHandle, StagingArea, ToolStrategy, remove_if_exists},
};

/// Writes each task's lines to a chunk file whose path replaces `{input}`.
///
/// Tools declared with `uses_stdout = false` also get their output file
/// redirected to a per-task temp path.
pub struct StagedStrategy {
    def: Arc<ToolDefinition>,
    staging: StagingArea,
    wordlist: Option<String>,
}

impl StagedStrategy {
    pub fn new(def: Arc<ToolDefinition>, staging: StagingArea, wordlist: Option<String>) -> Self {
        Self {
            def,
            staging,
            wordlist,
        }
    }

    fn expand(
        &self,
        input: &InputHandle,
        args: &[String],
        output: Option<&str>,
    ) -> Result<Vec<String>, ExecError> {
        Ok(self
            .def
            .expand_command(&input.as_arg(), args, output, self.wordlist.as_deref())?)
    }
}

#[async_trait]
impl ToolStrategy for StagedStrategy {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn needs_staged_input(&self) -> bool {
        true
    }

    async fn prepare_input(
        &self,
        lines: &[String],
        task: TaskId,
        range: LineRange,
    ) -> Result<InputHandle, ExecError> {
        let path = self.staging.chunk_path(task);
        let mut body = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines {
            body.push_str(line);
            body.push('\n');
        }

        if let Err(source) = tokio::fs::write(&path, body).await {
            // a partially written chunk must not outlive the failed task
            let _ = tokio::fs::remove_file(&path).await;
            return Err(ExecError::Staging { path, source });
        }
        trace!(task = %task, %range, path = %path.display(), "chunk staged");
        Ok(InputHandle::Staged(path))
    }

    fn build_command(
        &self,
        input: &InputHandle,
        args: &[String],
    ) -> Result<Vec<String>, ExecError> {
        let (args, _) = strip_flags(args, &self.def.output_flags());
        self.expand(input, &args, None)
    }

    async fn cleanup(&self, input: &InputHandle) -> Result<(), ExecError> {
        match input.staged_path() {
            Some(path) => remove_if_exists(path).await,
            None => Ok(()),
        }
    }

    fn file_output(&self) -> Option<&dyn FileOutputStrategy> {
        if self.def.uses_stdout {
            None
        } else {
            Some(self)
        }
    }
}

impl FileOutputStrategy for StagedStrategy {
    /// File-output tools always write to the temp path, with or without an
    /// output flag from the user.
    fn handles_file_output(&self, _args: &[String]) -> bool {
        !self.def.uses_stdout
    }

    fn build_command_with_file_output(
        &self,
        input: &InputHandle,
        args: &[String],
        task: TaskId,
    ) -> Result<(Vec<String>, PathBuf), ExecError> {
        let temp = self.staging.output_path(&self.def.name, task);
        let temp_arg = temp.to_string_lossy().into_owned();
        let flags = self.def.output_flags();

        let args = if self.def.template_has("{output}") {
            strip_flags(args, &flags).0
        } else {
            let mut rewrite = rewrite_output_flags(args, &flags, &temp_arg);
            if rewrite.flag.is_none() {
                // output_flags() is never empty
                if let Some(default) = flags.first() {
                    rewrite.args.push(default.to_string());
                    rewrite.args.push(temp_arg.clone());
                }
            }
            rewrite.args
        };

        let argv = self.expand(input, &args, Some(&temp_arg))?;
        Ok((argv, temp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn arjun(dir: &std::path::Path) -> StagedStrategy {
        let def = ToolDefinition::new("arjun", "arjun -i {input} {args} {auto_optimizations}")
            .with_file_output(&["-oT", "-oJ", "-o"])
            .with_auto_optimizations(&["-t 10"])
            .with_alias("-t", &["--threads"]);
        StagedStrategy::new(
            Arc::new(def),
            StagingArea::with_run_id(dir, "run1"),
            None,
        )
    }

    #[tokio::test]
    async fn stages_chunk_and_cleans_up_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        let def = ToolDefinition::new("httpx", "httpx -l {input} {args}");
        let s = StagedStrategy::new(
            Arc::new(def),
            StagingArea::with_run_id(dir.path(), "r"),
            None,
        );
        assert!(s.needs_staged_input());
        assert!(s.file_output().is_none());

        let lines = strings(&["a.com", "b.com"]);
        let handle = s
            .prepare_input(&lines, TaskId::new(1), LineRange::new(4, 6))
            .await
            .unwrap();
        let path = handle.staged_path().unwrap().to_path_buf();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a.com\nb.com\n");

        let argv = s
            .build_command(&handle, &strings(&["-sc", "-o", "mine.txt"]))
            .unwrap();
        assert_eq!(argv[0], "httpx");
        assert_eq!(argv[3], "-sc");
        assert_eq!(argv.len(), 4);

        s.cleanup(&handle).await.unwrap();
        assert!(!path.exists());
        s.cleanup(&handle).await.unwrap();
    }

    #[tokio::test]
    async fn staging_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let def = ToolDefinition::new("httpx", "httpx -l {input}");
        let s = StagedStrategy::new(
            Arc::new(def),
            StagingArea::with_run_id(dir.path().join("missing"), "r"),
            None,
        );
        let err = s
            .prepare_input(&strings(&["x"]), TaskId::new(0), LineRange::new(0, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Staging { .. }));
    }

    #[test]
    fn appends_default_output_flag_when_user_gave_none() {
        let dir = tempfile::tempdir().unwrap();
        let s = arjun(dir.path());
        let fo = s.file_output().unwrap();
        assert!(fo.handles_file_output(&[]));

        let input = InputHandle::Staged(dir.path().join("chunk.txt"));
        let (argv, temp) = fo
            .build_command_with_file_output(&input, &[], TaskId::new(2))
            .unwrap();
        let temp_arg = temp.to_string_lossy().into_owned();

        assert!(temp_arg.ends_with("bulker_arjun_output_run1_2.tmp"));
        assert_eq!(&argv[3..], ["-oT", temp_arg.as_str(), "-t", "10"]);

        let (_, again) = fo
            .build_command_with_file_output(&input, &[], TaskId::new(2))
            .unwrap();
        assert_eq!(temp, again);
    }

    #[test]
    fn rewrites_user_output_flag_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let s = arjun(dir.path());
        let fo = s.file_output().unwrap();

        let input = InputHandle::Staged(dir.path().join("chunk.txt"));
        let args = strings(&["-oJ", "mine.json", "--threads", "2"]);
        let (argv, temp) = fo
            .build_command_with_file_output(&input, &args, TaskId::new(0))
            .unwrap();
        let temp_arg = temp.to_string_lossy().into_owned();

        assert_eq!(&argv[3..], ["-oJ", temp_arg.as_str(), "--threads", "2"]);
    }

    #[test]
    fn output_placeholder_replaces_user_flags() {
        let dir = tempfile::tempdir().unwrap();
        let def = ToolDefinition::new("nmap", "nmap -iL {input} -oN {output} {args}")
            .with_file_output(&["-oN"]);
        let s = StagedStrategy::new(
            Arc::new(def),
            StagingArea::with_run_id(dir.path(), "r"),
            None,
        );
        let fo = s.file_output().unwrap();
        let input = InputHandle::Staged(dir.path().join("c.txt"));
        let (argv, temp) = fo
            .build_command_with_file_output(
                &input,
                &strings(&["-oN", "mine.txt", "-sV"]),
                TaskId::new(0),
            )
            .unwrap();

        let temp_arg = temp.to_string_lossy().into_owned();
        assert_eq!(argv[3], "-oN");
        assert_eq!(argv[4], temp_arg);
        assert_eq!(&argv[5..], ["-sV"]);
    }
}
