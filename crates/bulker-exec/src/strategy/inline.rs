use std::sync::Arc;

use async_trait::async_trait;
use bulker_model::{LineRange, TaskId, ToolDefinition, strip_flags};

use crate::{
    error::ExecError,
    strategy::{InputHandle, ToolStrategy},
};

/// Passes the task's lines straight into the command line; nothing is staged.
pub struct InlineStrategy {
    def: Arc<ToolDefinition>,
    wordlist: Option<String>,
}

impl InlineStrategy {
    pub fn new(def: Arc<ToolDefinition>, wordlist: Option<String>) -> Self {
        Self { def, wordlist }
    }
}

#[async_trait]
impl ToolStrategy for InlineStrategy {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn needs_staged_input(&self) -> bool {
        false
    }

    async fn prepare_input(
        &self,
        lines: &[String],
        _task: TaskId,
        _range: LineRange,
    ) -> Result<InputHandle, ExecError> {
        Ok(InputHandle::Inline(lines.join("\n")))
    }

    fn build_command(
        &self,
        input: &InputHandle,
        args: &[String],
    ) -> Result<Vec<String>, ExecError> {
        let (args, _) = strip_flags(args, &self.def.output_flags());
        let argv =
            self.def
                .expand_command(&input.as_arg(), &args, None, self.wordlist.as_deref())?;
        Ok(argv)
    }

    async fn cleanup(&self, _input: &InputHandle) -> Result<(), ExecError> {
        Ok(())
    }
}
