use std::path::{Path, PathBuf};

use bulker_model::TaskId;

/// Directory and run id that make every per-task artifact name unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingArea {
    dir: PathBuf,
    run_id: String,
}

impl StagingArea {
    /// Fresh run id, so concurrent runs sharing `dir` never collide.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        Self::with_run_id(dir, &id[..12])
    }

    pub fn with_run_id(dir: impl Into<PathBuf>, run_id: &str) -> Self {
        Self {
            dir: dir.into(),
            run_id: run_id.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn chunk_path(&self, task: TaskId) -> PathBuf {
        self.dir
            .join(format!("bulker_chunk_{}_{}.txt", self.run_id, task.index()))
    }

    pub fn output_path(&self, tool: &str, task: TaskId) -> PathBuf {
        let tool: String = tool
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.dir.join(format!(
            "bulker_{tool}_output_{}_{}.tmp",
            self.run_id,
            task.index()
        ))
    }
}
