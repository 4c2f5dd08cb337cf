//! Request-scoped workspace
//!
//! 每个请求一个临时目录 `<root>/req-XXXXXX/`，保存上传的源文件和动图试编码产物。
//! `Workspace` drop 时整个目录被删除；`ScratchFile` drop 时单个文件被删除。
//! 清理失败只记录 warn，不会向上传播。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tempfile::TempDir;

use crate::errors::{CompressError, Result};
use crate::types::FileSize;

#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
    counter: AtomicU64,
}

impl Workspace {
    /// Create a fresh directory under `root` (created if missing).
    pub fn create(root: &Path) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| CompressError::workspace(root, e))?;
        let dir = tempfile::Builder::new()
            .prefix("req-")
            .tempdir_in(root)
            .map_err(|e| CompressError::workspace(root, e))?;
        let path = dir.path().to_path_buf();
        tracing::debug!(workspace = ?path, "Workspace created");
        Ok(Self {
            dir: Some(dir),
            path,
            counter: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unique path for one attempt, e.g. `trial-0003.gif`.
    pub fn unique_path(&self, stem: &str, extension: &str) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        self.path.join(format!("{}-{:04}.{}", stem, n, extension))
    }

    /// A unique path wrapped in a guard that deletes the file on drop.
    pub fn scratch(&self, stem: &str, extension: &str) -> ScratchFile {
        ScratchFile::new(self.unique_path(stem, extension))
    }

    /// Store the uploaded bytes inside the workspace.
    pub fn write_source(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        // 只保留文件名部分，避免 "../" 之类跳出工作目录
        let name = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("source");
        let path = self.path.join(format!("src-{}", name));
        fs::write(&path, bytes).map_err(|e| CompressError::workspace(&path, e))?;
        Ok(path)
    }

    /// Number of entries currently in the workspace directory.
    pub fn entry_count(&self) -> usize {
        fs::read_dir(&self.path).map(|rd| rd.count()).unwrap_or(0)
    }

    /// Explicit cleanup; same as dropping.
    pub fn close(mut self) {
        self.cleanup();
    }

    fn cleanup(&mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => tracing::debug!(workspace = ?self.path, "Workspace removed"),
                Err(e) => tracing::warn!(workspace = ?self.path, error = %e, "Failed to remove workspace"),
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}

// ============================================================================
// ScratchFile
// ============================================================================

/// A file path that is deleted when the guard is dropped.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    armed: bool,
}

impl ScratchFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> Result<FileSize> {
        let meta = fs::metadata(&self.path).map_err(|e| CompressError::workspace(&self.path, e))?;
        Ok(FileSize::new(meta.len()))
    }

    /// Keep the file; the caller now owns it.
    pub fn persist(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = ?self.path, error = %e, "Failed to remove scratch file"),
        }
    }
}
