use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::ModelError;

/// Default interval between progress reports.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Default time granted to running tasks after an interrupt.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Where input lines come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(PathBuf),
    /// Standard input, selected with `-`.
    Stdin,
}

impl InputSource {
    pub fn parse(raw: &str) -> Self {
        if raw == "-" {
            InputSource::Stdin
        } else {
            InputSource::File(PathBuf::from(raw))
        }
    }
}

impl From<&str> for InputSource {
    fn from(raw: &str) -> Self {
        InputSource::parse(raw)
    }
}

impl From<PathBuf> for InputSource {
    fn from(path: PathBuf) -> Self {
        if path.as_os_str() == "-" {
            InputSource::Stdin
        } else {
            InputSource::File(path)
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::File(path) => write!(f, "{}", path.display()),
            InputSource::Stdin => f.write_str("<stdin>"),
        }
    }
}

/// Validated parameters of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: InputSource,
    pub output: PathBuf,
    /// Upper bound on concurrently running tasks.
    pub workers: usize,
    /// Catalog name of the wrapped tool.
    pub tool: String,
    /// Extra arguments forwarded to every invocation.
    pub tool_args: Vec<String>,
    pub wordlist: Option<PathBuf>,
    /// Directory for chunk files and temp outputs.
    pub staging_dir: PathBuf,
    pub poll_interval: Duration,
    pub grace_period: Duration,
    /// Install SIGINT/SIGTERM handlers for the duration of the run.
    pub listen_for_signals: bool,
}

impl RunConfig {
    pub fn new(
        tool: impl Into<String>,
        input: impl Into<InputSource>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            workers: 1,
            tool: tool.into(),
            tool_args: Vec::new(),
            wordlist: None,
            staging_dir: std::env::temp_dir(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            grace_period: DEFAULT_GRACE_PERIOD,
            listen_for_signals: false,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.tool_args = args;
        self
    }

    pub fn with_wordlist(mut self, wordlist: impl Into<PathBuf>) -> Self {
        self.wordlist = Some(wordlist.into());
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    pub fn with_signals(mut self, listen: bool) -> Self {
        self.listen_for_signals = listen;
        self
    }

    pub fn wordlist_str(&self) -> Option<String> {
        self.wordlist
            .as_deref()
            .map(Path::to_string_lossy)
            .map(|s| s.into_owned())
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.workers == 0 {
            return Err(ModelError::InvalidConfig("workers must be >= 1".into()));
        }
        if self.tool.trim().is_empty() {
            return Err(ModelError::InvalidConfig("tool name is empty".into()));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ModelError::InvalidConfig("output path is empty".into()));
        }
        if matches!(&self.input, InputSource::File(path) if path.as_os_str().is_empty()) {
            return Err(ModelError::InvalidConfig("input path is empty".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(ModelError::InvalidConfig("poll interval must be > 0".into()));
        }
        Ok(())
    }
}
