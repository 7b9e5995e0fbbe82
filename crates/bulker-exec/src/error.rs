use std::path::PathBuf;

use bulker_model::TemplateError;
use thiserror::Error;

pub type ExecResult<T> = Result<T, ExecError>;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("no strategy supports tool {0}")]
    NoStrategy(String),
    #[error("non-zero exit code: {code}")]
    NonZeroExit { code: i32 },
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("killed by signal")]
    KilledBySignal,
    #[error("missing program")]
    MissingProgram,
    #[error("io error: {0}")]
    Io(String),
    #[error("cancelled")]
    Cancelled,
    #[error("command template: {0}")]
    Template(#[from] TemplateError),
    #[error("staging {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExecError {
    /// Failures of the child process itself, as opposed to local preparation errors.
    pub fn is_execution_failure(&self) -> bool {
        matches!(
            self,
            ExecError::NonZeroExit { .. }
                | ExecError::Spawn(_)
                | ExecError::KilledBySignal
                | ExecError::MissingProgram
                | ExecError::Io(_)
        )
    }
}

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e.to_string())
    }
}
