// src/asset/report.rs

use std::path::PathBuf;

use tracing::{error, info};

use crate::errors::BuildError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Skipped,
    Written,
    Failed,
}

/// Outcome for one source file.
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    /// Destination path, when one could be resolved.
    pub dest: Option<PathBuf>,
    pub status: FileStatus,
    pub error: Option<BuildError>,
}

impl FileReport {
    pub fn skipped(path: PathBuf, dest: PathBuf) -> Self {
        Self {
            path,
            dest: Some(dest),
            status: FileStatus::Skipped,
            error: None,
        }
    }

    pub fn written(path: PathBuf, dest: PathBuf) -> Self {
        Self {
            path,
            dest: Some(dest),
            status: FileStatus::Written,
            error: None,
        }
    }

    pub fn failed(path: PathBuf, dest: Option<PathBuf>, error: BuildError) -> Self {
        Self {
            path,
            dest,
            status: FileStatus::Failed,
            error: Some(error),
        }
    }

    /// `"<file>: <reason>"`, or `None` for files that did not fail.
    pub fn failure_line(&self) -> Option<String> {
        let err = self.error.as_ref()?;
        let reason = match err {
            BuildError::Transform { step, message, .. } => {
                format!("step '{step}' failed: {message}")
            }
            BuildError::Io { path, source } if *path != self.path => {
                format!("{}: {source}", path.display())
            }
            BuildError::Io { source, .. } => source.to_string(),
            other => other.to_string(),
        };
        Some(format!("{}: {reason}", self.path.display()))
    }
}

/// Per-file results of one [`AssetTask`](super::AssetTask) run, in
/// enumeration order.
#[derive(Debug, Default)]
pub struct TaskReport {
    pub task: String,
    pub files: Vec<FileReport>,
}

impl TaskReport {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            files: Vec::new(),
        }
    }

    /// True iff no file failed.
    pub fn is_ok(&self) -> bool {
        self.failed() == 0
    }

    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }

    pub fn written(&self) -> usize {
        self.count(FileStatus::Written)
    }

    pub fn skipped(&self) -> usize {
        self.count(FileStatus::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(FileStatus::Failed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.status == FileStatus::Failed)
    }

    pub fn file(&self, path: &std::path::Path) -> Option<&FileReport> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Log one summary line plus one line per failed file.
    pub fn log_summary(&self) {
        for line in self.failures().filter_map(FileReport::failure_line) {
            error!(task = %self.task, "{line}");
        }
        info!(
            task = %self.task,
            written = self.written(),
            skipped = self.skipped(),
            failed = self.failed(),
            "task finished"
        );
    }
}
