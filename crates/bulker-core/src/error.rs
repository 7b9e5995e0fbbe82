use std::path::PathBuf;

use bulker_exec::ExecError;
use bulker_model::{ModelError, TemplateError};
use thiserror::Error;

use crate::catalog::CatalogError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("read input {input}: {source}")]
    Input {
        input: String,
        #[source]
        source: std::io::Error,
    },
    #[error("output {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("staging dir {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("wordlist not found: {0}")]
    Wordlist(PathBuf),
    #[error("output sink is closed")]
    SinkClosed,
}

impl CoreError {
    pub(crate) fn output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Output {
            path: path.into(),
            source,
        }
    }
}
