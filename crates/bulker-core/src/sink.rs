use std::path::{Path, PathBuf};

use time::{OffsetDateTime, macros::format_description};
use tokio::{fs::File, io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, trace};

use crate::error::CoreError;

/// The single consolidated output file.
///
/// Appends are serialized by one mutex and synced to storage before the lock
/// is released. There is no ordering between tasks.
#[derive(Debug)]
pub struct OutputSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl OutputSink {
    /// Moves an existing file at `path` aside, creates missing parent
    /// directories, creates the file and writes `header` as its first line.
    ///
    /// Returns the sink and the backup location, if one was made.
    pub async fn prepare(
        path: impl Into<PathBuf>,
        header: Option<&str>,
    ) -> Result<(Self, Option<PathBuf>), CoreError> {
        let path = path.into();
        let backup = backup_existing(&path).await?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::output(parent, e))?;
        }

        let file = File::create(&path)
            .await
            .map_err(|e| CoreError::output(&path, e))?;
        let sink = Self {
            path,
            file: Mutex::new(Some(file)),
        };
        if let Some(header) = header {
            sink.append(header).await?;
        }
        Ok((sink, backup))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `content`, newline-terminated. Empty content is a no-op.
    pub async fn append(&self, content: &str) -> Result<(), CoreError> {
        if content.is_empty() {
            return Ok(());
        }
        let mut guard = self.file.lock().await;
        let file = guard.as_mut().ok_or(CoreError::SinkClosed)?;

        let write = async {
            file.write_all(content.as_bytes()).await?;
            if !content.ends_with('\n') {
                file.write_all(b"\n").await?;
            }
            file.flush().await?;
            file.sync_data().await
        };
        write.await.map_err(|e| CoreError::output(&self.path, e))
    }

    /// Flushes and closes the file. Later appends fail with `SinkClosed`.
    pub async fn close(&self) -> Result<(), CoreError> {
        let Some(mut file) = self.file.lock().await.take() else {
            return Ok(());
        };
        file.flush()
            .await
            .map_err(|e| CoreError::output(&self.path, e))?;
        file.sync_all()
            .await
            .map_err(|e| CoreError::output(&self.path, e))?;
        trace!(path = %self.path.display(), "output closed");
        Ok(())
    }

    pub async fn is_closed(&self) -> bool {
        self.file.lock().await.is_none()
    }
}

/// `<base>_<YYYYMMDD_HHMMSS><ext>` next to `path`.
pub fn backup_path_for(path: &Path, at: OffsetDateTime) -> PathBuf {
    with_suffix(path, &stamp(at))
}

fn stamp(at: OffsetDateTime) -> String {
    at.format(format_description!(
        "[year][month][day]_[hour][minute][second]"
    ))
    .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{suffix}"),
    };
    path.with_file_name(name)
}

/// Renames an existing output out of the way without overwriting anything.
async fn backup_existing(path: &Path) -> Result<Option<PathBuf>, CoreError> {
    let exists = tokio::fs::try_exists(path)
        .await
        .map_err(|e| CoreError::output(path, e))?;
    if !exists {
        return Ok(None);
    }

    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let stamp = stamp(now);
    let mut candidate = with_suffix(path, &stamp);
    let mut n = 1;
    while tokio::fs::try_exists(&candidate)
        .await
        .map_err(|e| CoreError::output(&candidate, e))?
    {
        candidate = with_suffix(path, &format!("{stamp}_{n}"));
        n += 1;
    }

    tokio::fs::rename(path, &candidate)
        .await
        .map_err(|e| CoreError::output(path, e))?;
    debug!(from = %path.display(), to = %candidate.display(), "output backed up");
    Ok(Some(candidate))
}
