//! Pending upload content gathered from local paths.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Errors that can occur while collecting files to share.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// The path does not exist.
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    /// The path could not be inspected.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Walking a directory failed part way.
    #[error("failed to walk directory {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl SelectionError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn walk(path: impl Into<PathBuf>, source: walkdir::Error) -> Self {
        Self::Walk {
            path: path.into(),
            source,
        }
    }
}

/// A local file waiting to be shared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    /// Where the bytes live on disk
    pub source: PathBuf,
    /// Slash-separated path as it will appear in the share listing
    pub relative_path: String,
    pub size: u64,
}

impl PendingFile {
    /// Base name of the file.
    pub fn name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }
}

/// Files and text collected for the next share
#[derive(Debug, Clone, Default)]
pub struct UploadSelection {
    files: Vec<PendingFile>,
    text: String,
}

impl UploadSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, or every file under a directory.
    ///
    /// Files under a directory keep the directory's own name as their leading
    /// path segment, so `add_path("photos")` yields `photos/2024/a.jpg`.
    /// Returns the number of files added.
    pub fn add_path(&mut self, path: &Path) -> Result<usize, SelectionError> {
        if !path.exists() {
            return Err(SelectionError::not_found(path));
        }

        let path = path
            .canonicalize()
            .map_err(|e| SelectionError::io(path, e))?;

        if path.is_file() {
            let size = file_size(&path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string());
            self.files.push(PendingFile {
                source: path,
                relative_path: name,
                size,
            });
            return Ok(1);
        }

        let root_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "folder".to_string());

        let mut added = 0;
        for entry in WalkDir::new(&path).sort_by_file_name() {
            let entry = entry.map_err(|e| SelectionError::walk(&path, e))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let rel = entry
                .path()
                .strip_prefix(&path)
                .unwrap_or(entry.path())
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");

            self.files.push(PendingFile {
                source: entry.path().to_path_buf(),
                relative_path: format!("{}/{}", root_name, rel),
                size: file_size(entry.path())?,
            });
            added += 1;
        }

        debug!(dir = %path.display(), added, "Added directory to selection");
        Ok(added)
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn files(&self) -> &[PendingFile] {
        &self.files
    }

    /// The text payload, trimmed; `None` when blank.
    pub fn text(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Whether there is anything to share.
    pub fn has_content(&self) -> bool {
        !self.files.is_empty() || self.text().is_some()
    }

    /// Short description of what is being shared.
    pub fn content_kind(&self) -> &'static str {
        match (!self.files.is_empty(), self.text().is_some()) {
            (true, true) => "files and text",
            (true, false) => "files",
            _ => "text",
        }
    }
}

fn file_size(path: &Path) -> Result<u64, SelectionError> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| SelectionError::io(path, e))
}
