use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid line range reference: {0} (expected lines_<start>_<end>)")]
    InvalidRange(String),
    #[error("unknown tool mode: {0} (expected: single|multiple)")]
    InvalidMode(String),
    #[error("invalid run config: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("command template is empty")]
    Empty,
    #[error("unbalanced quotes in {0}")]
    Unbalanced(String),
    #[error("template needs a wordlist but none was given")]
    MissingWordlist,
}
