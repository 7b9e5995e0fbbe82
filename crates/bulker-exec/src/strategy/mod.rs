use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use bulker_model::{LineRange, TaskId};

use crate::error::ExecError;

mod inline;
pub use inline::InlineStrategy;

mod staged;
pub use staged::StagedStrategy;

mod staging;
pub use staging::StagingArea;

/// What replaces `{input}` for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputHandle {
    /// Path of a chunk file owned by the task.
    Staged(PathBuf),
    /// The task's lines joined with `\n`.
    Inline(String),
}

impl InputHandle {
    pub fn as_arg(&self) -> Cow<'_, str> {
        match self {
            InputHandle::Staged(path) => path.to_string_lossy(),
            InputHandle::Inline(text) => Cow::Borrowed(text),
        }
    }

    pub fn staged_path(&self) -> Option<&Path> {
        match self {
            InputHandle::Staged(path) => Some(path),
            InputHandle::Inline(_) => None,
        }
    }
}

/// Per-tool policy: how input is handed over and how argv is built.
#[async_trait]
pub trait ToolStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Whether `prepare_input` writes a chunk file.
    fn needs_staged_input(&self) -> bool;

    /// `lines` are the task's own lines; `range` locates them in the input.
    async fn prepare_input(
        &self,
        lines: &[String],
        task: TaskId,
        range: LineRange,
    ) -> Result<InputHandle, ExecError>;

    /// Argv for a tool whose results arrive on stdout.
    fn build_command(&self, input: &InputHandle, args: &[String])
    -> Result<Vec<String>, ExecError>;

    /// Removes whatever `prepare_input` created. Safe to call more than once.
    async fn cleanup(&self, input: &InputHandle) -> Result<(), ExecError>;

    /// Capability for tools that write their results to a file of their own.
    fn file_output(&self) -> Option<&dyn FileOutputStrategy> {
        None
    }
}

/// Redirects a tool's self-managed output file to a per-task temp path.
pub trait FileOutputStrategy: Send + Sync {
    fn handles_file_output(&self, args: &[String]) -> bool;

    /// Argv plus the temp path the tool will write to. The path is derived
    /// from the run and the task only, so repeated calls agree.
    fn build_command_with_file_output(
        &self,
        input: &InputHandle,
        args: &[String],
        task: TaskId,
    ) -> Result<(Vec<String>, PathBuf), ExecError>;
}

/// Removes `path`, treating "already gone" as success.
pub(crate) async fn remove_if_exists(path: &Path) -> Result<(), ExecError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ExecError::Staging {
            path: path.to_path_buf(),
            source,
        }),
    }
}
