//! Share record types.
//!
//! Records are serialized with camelCase keys so a persisted collection reads
//! the same as the payloads exchanged with the web front end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a share record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareId(pub Uuid);

impl ShareId {
    /// Generate a new random share ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ShareId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ShareId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ShareId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Unique identifier for one row of a share's file listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub Uuid);

impl FileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for FileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Whether a listing row is real content or a synthetic folder header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    File,
    Folder,
}

/// One entry in a share's file listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileItem {
    pub id: FileId,
    /// Display name; may carry a relative path for folder uploads
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: FileKind,
    /// Download location as resolved by the share service. Empty for folders.
    pub url: String,
    /// Slash-separated relative path
    pub path: String,
}

impl FileItem {
    /// Create a content row.
    pub fn file(
        name: impl Into<String>,
        path: impl Into<String>,
        size: u64,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: FileId::new(),
            name: name.into(),
            size,
            kind: FileKind::File,
            url: url.into(),
            path: path.into(),
        }
    }

    /// Create a synthetic folder row.
    pub fn folder(name: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        Self {
            id: FileId::new(),
            path: name.clone(),
            name,
            size,
            kind: FileKind::Folder,
            url: String::new(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind == FileKind::Folder
    }
}

/// One share record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedFolder {
    pub id: ShareId,
    pub name: String,
    pub access_code: String,
    pub files: Vec<FileItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub burn_after_reading: bool,
    pub is_deleted: bool,
}

impl SharedFolder {
    /// Content rows only, skipping synthetic folder headers.
    pub fn file_rows(&self) -> impl Iterator<Item = &FileItem> {
        self.files.iter().filter(|f| f.is_file())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Derived status at `now`. See [`status`].
    pub fn status_at(&self, now: DateTime<Utc>) -> ShareStatus {
        status(self, now)
    }
}

/// Visibility status of a share, always derived and never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareStatus {
    /// Share can be viewed and downloaded
    Active,
    /// Past its expiry time
    Expired,
    /// Burned or revoked
    Deleted,
}

impl ShareStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ShareStatus::Active => "active",
            ShareStatus::Expired => "expired",
            ShareStatus::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for ShareStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

/// Derive the status of a record at `now`.
///
/// `Deleted` takes precedence over `Expired`: a burned share reports why it
/// is gone even after its expiry has also passed.
pub fn status(record: &SharedFolder, now: DateTime<Utc>) -> ShareStatus {
    if record.is_deleted {
        ShareStatus::Deleted
    } else if record.is_expired_at(now) {
        ShareStatus::Expired
    } else {
        ShareStatus::Active
    }
}

/// Human-readable byte count (1024-based, two decimals, trailing zeros trimmed).
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
