//! Transfer service: the create / access / download flows
//!
//! This module ties the share service client to the local registry and the
//! download-link cache. It owns the rules for when the service is asked,
//! when the local state answers instead, and when a burn-after-reading share
//! is consumed.

use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiError, ShareApi, UploadFile, UploadRequest};
use crate::link_cache::LinkCache;
use crate::registry::{
    folder_members, selected_files, FileItem, LookupError, NewShare, RegistryError, Selection,
    ShareDuration, ShareRegistry, ShareStatus, SharedFolder,
};
use crate::storage::KeyValueStore;

pub mod selection;

pub use selection::{PendingFile, SelectionError, UploadSelection};

/// Errors from transfer flows
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Nothing to share: add at least one file or some text")]
    NothingToShare,

    #[error("Access code cannot be empty")]
    EmptyCode,

    #[error("No files selected")]
    NothingSelected,

    #[error("Folder {0} contains no files")]
    EmptyFolder(String),

    #[error("Refusing to write outside the target directory: {0}")]
    UnsafePath(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for transfer operations
pub type TransferResult<T> = Result<T, TransferError>;

/// Options for a new share
#[derive(Debug, Clone, Default)]
pub struct ShareOptions {
    pub custom_code: Option<String>,
    pub burn_after_reading: bool,
    pub duration: ShareDuration,
}

/// What opening an access code produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessOutcome {
    /// The service (or the link cache) resolved the code to a download URL.
    Remote { url: String, cached: bool },
    /// The service was unreachable and a local record answered.
    Local(SharedFolder),
}

/// Orchestrates share creation, access and download
pub struct TransferService<S: KeyValueStore, A: ShareApi> {
    registry: ShareRegistry<S>,
    links: LinkCache<S>,
    api: A,
}

impl<S: KeyValueStore + Clone, A: ShareApi> TransferService<S, A> {
    /// Load local state from `store` and talk to the service through `api`.
    pub fn new(store: S, api: A) -> Self {
        Self {
            registry: ShareRegistry::load(store.clone()),
            links: LinkCache::load(store),
            api,
        }
    }
}

impl<S: KeyValueStore, A: ShareApi> TransferService<S, A> {
    pub fn registry(&self) -> &ShareRegistry<S> {
        &self.registry
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Upload the selection and record the new share locally.
    ///
    /// The service accepts a single file per upload; only the first pending
    /// file is transmitted and every listed file points at its URL.
    pub async fn create_share(
        &mut self,
        selection: &UploadSelection,
        options: ShareOptions,
    ) -> TransferResult<SharedFolder> {
        if !selection.has_content() {
            return Err(TransferError::NothingToShare);
        }

        let file = match selection.files().first() {
            Some(pending) => {
                let bytes = tokio::fs::read(&pending.source)
                    .await
                    .map_err(|source| TransferError::Read {
                        path: pending.source.clone(),
                        source,
                    })?;
                Some(UploadFile {
                    file_name: pending.name().to_string(),
                    bytes,
                })
            }
            None => None,
        };

        if selection.files().len() > 1 {
            warn!(
                count = selection.files().len(),
                "Only the first file is uploaded; remaining files are listed locally"
            );
        }

        let custom_code = options.custom_code.filter(|c| !c.trim().is_empty());

        info!(
            kind = selection.content_kind(),
            duration = %options.duration,
            burn = options.burn_after_reading,
            "Creating share"
        );

        let receipt = self
            .api
            .upload(UploadRequest {
                file,
                text: selection.text().map(str::to_string),
                code: custom_code,
                duration: options.duration,
            })
            .await?;

        debug!(code = %receipt.code, url = %receipt.file_url, "Upload accepted");

        let files = selection
            .files()
            .iter()
            .map(|pending| {
                FileItem::file(
                    pending.name(),
                    pending.relative_path.clone(),
                    pending.size,
                    receipt.file_url.clone(),
                )
            })
            .collect();

        let folder = self.registry.create(NewShare {
            files,
            text_content: selection.text().map(str::to_string),
            access_code: Some(receipt.code),
            burn_after_reading: options.burn_after_reading,
            duration: options.duration,
        })?;

        Ok(folder)
    }

    /// Open a share by access code.
    ///
    /// A code whose newest local record is deleted or expired is refused
    /// outright. Otherwise the link cache is consulted first, then the
    /// service. Only when the service cannot be reached does the local
    /// registry answer; a code the registry does not know then reports the
    /// transport failure.
    pub async fn access(&mut self, code: &str) -> TransferResult<AccessOutcome> {
        let code = validate_code(code)?;
        self.ensure_still_active(code)?;

        if let Some(url) = self.links.get(code) {
            let url = url.to_string();
            debug!(code, "Access code resolved from link cache");
            self.registry.consume_code(code);
            return Ok(AccessOutcome::Remote { url, cached: true });
        }

        match self.api.resolve_share(code).await {
            Ok(url) => {
                self.links.insert(code, &url);
                self.registry.consume_code(code);
                info!(code, "Access code resolved by share service");
                Ok(AccessOutcome::Remote { url, cached: false })
            }
            Err(e) if e.is_transport() => {
                warn!(code, error = %e, "Share service unreachable, checking local shares");
                match self.registry.find_by_code(code) {
                    Ok(folder) => Ok(AccessOutcome::Local(folder)),
                    Err(LookupError::NotFound(_)) => Err(TransferError::Api(e)),
                    Err(lookup) => Err(TransferError::Lookup(lookup)),
                }
            }
            Err(e) => Err(TransferError::Api(e)),
        }
    }

    /// Resolve a code to its download URL. Local records can refuse a code
    /// but never answer for it.
    pub async fn resolve_download(&mut self, code: &str) -> TransferResult<String> {
        let code = validate_code(code)?;
        self.ensure_still_active(code)?;

        if let Some(url) = self.links.get(code) {
            let url = url.to_string();
            self.registry.consume_code(code);
            return Ok(url);
        }

        let url = self.api.resolve_share(code).await?;
        self.links.insert(code, &url);
        self.registry.consume_code(code);
        Ok(url)
    }

    /// Fetch a resolved URL into `dest`.
    pub async fn download_url(&self, url: &str, dest: &Path) -> TransferResult<PathBuf> {
        let bytes = self.api.fetch(url).await?;
        write_file(dest, &bytes).await?;
        info!(path = %dest.display(), size = bytes.len(), "Downloaded file");
        Ok(dest.to_path_buf())
    }

    /// Download the selected file rows of an opened share into `dest_dir`.
    ///
    /// Downloading consumes a burn-after-reading share.
    pub async fn download_selected(
        &mut self,
        folder: &SharedFolder,
        selected: &Selection,
        dest_dir: &Path,
    ) -> TransferResult<Vec<PathBuf>> {
        let files = selected_files(folder, selected);
        if files.is_empty() {
            return Err(TransferError::NothingSelected);
        }

        self.burn_on_download(folder);

        let mut written = Vec::with_capacity(files.len());
        for file in files {
            let target = safe_join(dest_dir, &file.path)?;
            let bytes = self.api.fetch(&file.url).await?;
            write_file(&target, &bytes).await?;
            written.push(target);
        }

        info!(count = written.len(), dir = %dest_dir.display(), "Downloaded selected files");
        Ok(written)
    }

    /// Download every file under the synthetic folder `name` into
    /// `dest_dir/name/`.
    pub async fn download_folder(
        &mut self,
        folder: &SharedFolder,
        name: &str,
        dest_dir: &Path,
    ) -> TransferResult<Vec<PathBuf>> {
        let members = folder_members(folder, name);
        if members.is_empty() {
            return Err(TransferError::EmptyFolder(name.to_string()));
        }

        self.burn_on_download(folder);

        let root = safe_join(dest_dir, name)?;
        let mut written = Vec::with_capacity(members.len());
        for member in members {
            let target = safe_join(&root, member.relative_path)?;
            let bytes = self.api.fetch(&member.item.url).await?;
            write_file(&target, &bytes).await?;
            written.push(target);
        }

        info!(folder = name, count = written.len(), "Downloaded folder");
        Ok(written)
    }

    /// Refuse codes whose newest local record is no longer active. A cached
    /// link never outlives a burn, revoke or expiry.
    fn ensure_still_active(&self, code: &str) -> TransferResult<()> {
        match self.registry.code_status_at(code, Utc::now()) {
            Some(ShareStatus::Deleted) => Err(LookupError::Deleted(code.to_string()).into()),
            Some(ShareStatus::Expired) => Err(LookupError::Expired(code.to_string()).into()),
            _ => Ok(()),
        }
    }

    fn burn_on_download(&mut self, folder: &SharedFolder) {
        if folder.burn_after_reading && self.registry.mark_deleted(folder.id) {
            info!(share_id = %folder.id, "Burn after reading triggered by download");
        }
    }
}

fn validate_code(code: &str) -> TransferResult<&str> {
    let code = code.trim();
    if code.is_empty() {
        Err(TransferError::EmptyCode)
    } else {
        Ok(code)
    }
}

/// Join a slash-separated relative path onto `base`, rejecting anything that
/// would escape it.
fn safe_join(base: &Path, relative: &str) -> TransferResult<PathBuf> {
    let rel = Path::new(relative);
    let escapes = rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

    if relative.is_empty() || escapes {
        return Err(TransferError::UnsafePath(relative.to_string()));
    }
    Ok(base.join(rel))
}

async fn write_file(path: &Path, bytes: &[u8]) -> TransferResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| TransferError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| TransferError::Write {
            path: path.to_path_buf(),
            source,
        })
}
