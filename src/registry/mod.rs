//! Local registry of created shares
//!
//! The registry owns the in-memory collection of share records and mirrors it
//! to a single storage slot after every mutation. Visibility (active, expired,
//! deleted) is always derived from the record and the current time through
//! [`status`]; it is never stored.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::storage::{KeyValueStore, StorageResult};

pub mod code;
pub mod duration;
pub mod model;
pub mod organize;
pub mod selection;

pub use code::{generate_access_code, resolve_access_code};
pub use duration::{DurationParseError, ShareDuration};
pub use model::{
    format_file_size, status, FileId, FileItem, FileKind, ShareId, ShareStatus, SharedFolder,
};
pub use organize::organize_files;
pub use selection::{
    folder_members, selected_files, toggle_select_all, toggle_selection, FolderMember, Selection,
};

/// Storage slot holding the share collection
pub const SHARES_KEY: &str = "shared_folders";

/// Errors from registry mutations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Nothing to share: add at least one file or some text")]
    NothingToShare,
}

/// Why a lookup by access code did not yield a viewable share
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("No share found for access code {0}")]
    NotFound(String),

    #[error("Share {0} has expired")]
    Expired(String),

    #[error("Share {0} has been deleted")]
    Deleted(String),
}

/// Input for a new share record
#[derive(Debug, Clone, Default)]
pub struct NewShare {
    pub files: Vec<FileItem>,
    pub text_content: Option<String>,
    /// Custom access code; blank or absent means generate one
    pub access_code: Option<String>,
    pub burn_after_reading: bool,
    pub duration: ShareDuration,
}

/// A record paired with its status at listing time
#[derive(Debug, Clone)]
pub struct ListedShare<'a> {
    pub folder: &'a SharedFolder,
    pub status: ShareStatus,
}

/// The local share registry
pub struct ShareRegistry<S: KeyValueStore> {
    store: S,
    folders: Vec<SharedFolder>,
}

impl<S: KeyValueStore> ShareRegistry<S> {
    /// Load the persisted collection.
    ///
    /// A missing, unreadable or corrupt slot yields an empty registry; the
    /// condition is logged and never returned as an error.
    pub fn load(store: S) -> Self {
        let folders = match store.read(SHARES_KEY) {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<SharedFolder>>(&bytes) {
                Ok(folders) => {
                    debug!(count = folders.len(), "Loaded share collection");
                    folders
                }
                Err(e) => {
                    warn!(error = %e, "Stored share collection is corrupt, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => {
                debug!("No stored share collection");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Failed to read share collection, starting empty");
                Vec::new()
            }
        };

        Self { store, folders }
    }

    /// Write the whole collection to storage.
    pub fn persist(&self) -> StorageResult<()> {
        let bytes = serde_json::to_vec(&self.folders)?;
        self.store.write(SHARES_KEY, &bytes)
    }

    fn persist_or_warn(&self) {
        if let Err(e) = self.persist() {
            warn!(error = %e, "Failed to persist share collection, keeping in-memory state");
        }
    }

    /// All records in creation order.
    pub fn list(&self) -> &[SharedFolder] {
        &self.folders
    }

    /// All records with their status at `now`.
    pub fn list_with_status(&self, now: DateTime<Utc>) -> Vec<ListedShare<'_>> {
        self.folders
            .iter()
            .map(|folder| ListedShare {
                folder,
                status: status(folder, now),
            })
            .collect()
    }

    pub fn get(&self, id: ShareId) -> Option<&SharedFolder> {
        self.folders.iter().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Create and persist a new share record.
    pub fn create(&mut self, request: NewShare) -> Result<SharedFolder, RegistryError> {
        self.create_at(request, Utc::now())
    }

    /// [`create`](Self::create) with an explicit creation time.
    pub fn create_at(
        &mut self,
        request: NewShare,
        now: DateTime<Utc>,
    ) -> Result<SharedFolder, RegistryError> {
        let text_content = request
            .text_content
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        if request.files.is_empty() && text_content.is_none() {
            return Err(RegistryError::NothingToShare);
        }

        let access_code = resolve_access_code(request.access_code.as_deref());
        let folder = SharedFolder {
            id: ShareId::new(),
            name: format!("Share {}", now.format("%Y-%m-%d")),
            access_code,
            files: organize_files(request.files),
            text_content,
            created_at: now,
            expires_at: now + request.duration.as_chrono(),
            burn_after_reading: request.burn_after_reading,
            is_deleted: false,
        };

        self.folders.push(folder.clone());
        self.persist_or_warn();

        info!(
            share_id = %folder.id,
            code = %folder.access_code,
            files = folder.files.len(),
            burn = folder.burn_after_reading,
            expires_at = %folder.expires_at,
            "Share created"
        );
        Ok(folder)
    }

    /// Look up a share by access code.
    pub fn find_by_code(&mut self, code: &str) -> Result<SharedFolder, LookupError> {
        self.find_by_code_at(code, Utc::now())
    }

    /// [`find_by_code`](Self::find_by_code) at an explicit time.
    ///
    /// A successful lookup is a content access: burn-after-reading records
    /// are marked deleted (and persisted) before they are returned. When
    /// several records share a code the most recently created one wins.
    pub fn find_by_code_at(
        &mut self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<SharedFolder, LookupError> {
        let index = self
            .folders
            .iter()
            .rposition(|f| f.access_code == code)
            .ok_or_else(|| LookupError::NotFound(code.to_string()))?;

        match status(&self.folders[index], now) {
            ShareStatus::Deleted => Err(LookupError::Deleted(code.to_string())),
            ShareStatus::Expired => Err(LookupError::Expired(code.to_string())),
            ShareStatus::Active => {
                if self.folders[index].burn_after_reading {
                    self.folders[index].is_deleted = true;
                    self.persist_or_warn();
                    info!(share_id = %self.folders[index].id, "Burn after reading triggered");
                }
                Ok(self.folders[index].clone())
            }
        }
    }

    /// Mark a share deleted. Returns `true` if the flag changed.
    pub fn mark_deleted(&mut self, id: ShareId) -> bool {
        let Some(folder) = self.folders.iter_mut().find(|f| f.id == id) else {
            debug!(share_id = %id, "mark_deleted on unknown share");
            return false;
        };

        if folder.is_deleted {
            return false;
        }

        folder.is_deleted = true;
        self.persist_or_warn();
        info!(share_id = %id, "Share marked deleted");
        true
    }

    /// Burn the newest active burn-after-reading record for `code`, if any.
    /// Used when the share was consumed through the remote service.
    pub fn consume_code(&mut self, code: &str) -> bool {
        let target = self
            .folders
            .iter()
            .rev()
            .find(|f| f.access_code == code && f.burn_after_reading && !f.is_deleted)
            .map(|f| f.id);

        match target {
            Some(id) => self.mark_deleted(id),
            None => false,
        }
    }

    /// Status at `now` of the newest record carrying `code`, if any.
    pub fn code_status_at(&self, code: &str, now: DateTime<Utc>) -> Option<ShareStatus> {
        self.folders
            .iter()
            .rev()
            .find(|f| f.access_code == code)
            .map(|f| f.status_at(now))
    }

    /// Remove a record entirely.
    pub fn remove(&mut self, id: ShareId) -> Option<SharedFolder> {
        let index = self.folders.iter().position(|f| f.id == id)?;
        let removed = self.folders.remove(index);
        self.persist_or_warn();
        info!(share_id = %id, "Share removed");
        Some(removed)
    }

    /// Remove every record whose status at `now` is not active.
    pub fn purge_inactive(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.folders.len();
        self.folders.retain(|f| status(f, now) == ShareStatus::Active);
        let removed = before - self.folders.len();

        if removed > 0 {
            self.persist_or_warn();
            info!(count = removed, "Purged inactive shares");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageError};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).single().unwrap()
    }

    fn text_share(text: &str) -> NewShare {
        NewShare {
            text_content: Some(text.to_string()),
            ..Default::default()
        }
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn read(&self, _key: &str) -> StorageResult<Option<Vec<u8>>> {
            Err(StorageError::LockError)
        }

        fn write(&self, _key: &str, _value: &[u8]) -> StorageResult<()> {
            Err(StorageError::LockError)
        }
    }

    #[test]
    fn test_load_missing_slot_is_empty() {
        let registry = ShareRegistry::load(MemoryStore::new());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_load_corrupt_slot_is_empty() {
        let registry = ShareRegistry::load(MemoryStore::with_slot(SHARES_KEY, "{not json"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_load_unreadable_store_is_empty() {
        let registry = ShareRegistry::load(FailingStore);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let mut registry = ShareRegistry::load(FailingStore);
        let created = registry.create(text_share("hi")).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.find_by_code(&created.access_code).is_ok());
    }

    #[test]
    fn test_create_requires_content() {
        let mut registry = ShareRegistry::load(MemoryStore::new());
        assert_eq!(
            registry.create(NewShare::default()).unwrap_err(),
            RegistryError::NothingToShare
        );
        assert_eq!(
            registry.create(text_share("   \n")).unwrap_err(),
            RegistryError::NothingToShare
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_create_trims_text() {
        let mut registry = ShareRegistry::load(MemoryStore::new());
        let created = registry.create(text_share("  hello \n")).unwrap();
        assert_eq!(created.text_content.as_deref(), Some("hello"));
    }

    #[test]
    fn test_create_computes_expiry() {
        let mut registry = ShareRegistry::load(MemoryStore::new());
        for duration in ShareDuration::ALL {
            let created = registry
                .create_at(
                    NewShare {
                        duration,
                        ..text_share("x")
                    },
                    t0(),
                )
                .unwrap();
            assert_eq!(
                (created.expires_at - created.created_at).num_seconds() as u64,
                duration.as_seconds()
            );
            assert!(created.expires_at > created.created_at);
        }
    }

    #[test]
    fn test_create_uses_custom_code() {
        let mut registry = ShareRegistry::load(MemoryStore::new());
        let created = registry
            .create(NewShare {
                access_code: Some("team-42".to_string()),
                ..text_share("x")
            })
            .unwrap();
        assert_eq!(created.access_code, "team-42");
    }

    #[test]
    fn test_create_names_by_date() {
        let mut registry = ShareRegistry::load(MemoryStore::new());
        let created = registry.create_at(text_share("x"), t0()).unwrap();
        assert_eq!(created.name, "Share 2024-01-01");
    }

    #[test]
    fn test_find_expired() {
        let mut registry = ShareRegistry::load(MemoryStore::new());
        let created = registry
            .create_at(
                NewShare {
                    duration: ShareDuration::Hours1,
                    ..text_share("x")
                },
                t0(),
            )
            .unwrap();

        let later = t0() + Duration::hours(2);
        assert_eq!(
            registry.find_by_code_at(&created.access_code, later),
            Err(LookupError::Expired(created.access_code.clone()))
        );
    }

    #[test]
    fn test_expired_burn_share_is_not_burned() {
        let mut registry = ShareRegistry::load(MemoryStore::new());
        let created = registry
            .create_at(
                NewShare {
                    burn_after_reading: true,
                    duration: ShareDuration::Hours1,
                    ..text_share("x")
                },
                t0(),
            )
            .unwrap();

        let later = t0() + Duration::hours(2);
        assert!(registry.find_by_code_at(&created.access_code, later).is_err());
        assert!(!registry.get(created.id).unwrap().is_deleted);
    }

    #[test]
    fn test_mark_deleted_is_idempotent() {
        let mut registry = ShareRegistry::load(MemoryStore::new());
        let created = registry.create(text_share("x")).unwrap();

        assert!(registry.mark_deleted(created.id));
        assert!(!registry.mark_deleted(created.id));
        assert!(registry.get(created.id).unwrap().is_deleted);
        assert!(!registry.mark_deleted(ShareId::new()));
    }

    #[test]
    fn test_deleted_reported_before_expired() {
        let mut registry = ShareRegistry::load(MemoryStore::new());
        let created = registry.create_at(text_share("x"), t0()).unwrap();
        registry.mark_deleted(created.id);

        let much_later = t0() + Duration::days(60);
        assert_eq!(
            registry.find_by_code_at(&created.access_code, much_later),
            Err(LookupError::Deleted(created.access_code.clone()))
        );
    }

    #[test]
    fn test_newest_record_wins_on_code_collision() {
        let mut registry = ShareRegistry::load(MemoryStore::new());
        let request = |text: &str| NewShare {
            access_code: Some("SAME".to_string()),
            ..text_share(text)
        };
        registry.create(request("first")).unwrap();
        registry.create(request("second")).unwrap();

        let found = registry.find_by_code("SAME").unwrap();
        assert_eq!(found.text_content.as_deref(), Some("second"));
    }

    #[test]
    fn test_consume_code_burns_only_burn_records() {
        let mut registry = ShareRegistry::load(MemoryStore::new());
        let plain = registry.create(text_share("plain")).unwrap();
        let burn = registry
            .create(NewShare {
                burn_after_reading: true,
                ..text_share("burn")
            })
            .unwrap();

        assert!(!registry.consume_code(&plain.access_code));
        assert!(registry.consume_code(&burn.access_code));
        assert!(!registry.consume_code(&burn.access_code));
        assert!(registry.get(burn.id).unwrap().is_deleted);
    }

    #[test]
    fn test_remove_unknown_is_none() {
        let mut registry = ShareRegistry::load(MemoryStore::new());
        assert!(registry.remove(ShareId::new()).is_none());
    }

    #[test]
    fn test_list_with_status() {
        let mut registry = ShareRegistry::load(MemoryStore::new());
        let short = registry
            .create_at(
                NewShare {
                    duration: ShareDuration::Hours1,
                    ..text_share("short")
                },
                t0(),
            )
            .unwrap();
        let long = registry
            .create_at(
                NewShare {
                    duration: ShareDuration::Days7,
                    ..text_share("long")
                },
                t0(),
            )
            .unwrap();
        let gone = registry.create_at(text_share("gone"), t0()).unwrap();
        registry.mark_deleted(gone.id);

        let listed = registry.list_with_status(t0() + Duration::hours(3));
        let statuses: Vec<(ShareId, ShareStatus)> =
            listed.iter().map(|l| (l.folder.id, l.status)).collect();
        assert_eq!(
            statuses,
            vec![
                (short.id, ShareStatus::Expired),
                (long.id, ShareStatus::Active),
                (gone.id, ShareStatus::Deleted),
            ]
        );
    }

    #[test]
    fn test_purge_inactive() {
        let mut registry = ShareRegistry::load(MemoryStore::new());
        registry
            .create_at(
                NewShare {
                    duration: ShareDuration::Hours1,
                    ..text_share("short")
                },
                t0(),
            )
            .unwrap();
        let keep = registry
            .create_at(
                NewShare {
                    duration: ShareDuration::Days30,
                    ..text_share("keep")
                },
                t0(),
            )
            .unwrap();

        assert_eq!(registry.purge_inactive(t0() + Duration::days(1)), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list()[0].id, keep.id);
        assert_eq!(registry.purge_inactive(t0() + Duration::days(1)), 0);
    }

    #[test]
    fn test_code_status_follows_newest_record() {
        let mut registry = ShareRegistry::load(MemoryStore::new());
        assert_eq!(registry.code_status_at("SAME", t0()), None);

        let old = registry
            .create_at(
                NewShare {
                    access_code: Some("SAME".to_string()),
                    ..text_share("old")
                },
                t0(),
            )
            .unwrap();
        registry.mark_deleted(old.id);
        assert_eq!(
            registry.code_status_at("SAME", t0()),
            Some(ShareStatus::Deleted)
        );

        registry
            .create_at(
                NewShare {
                    access_code: Some("SAME".to_string()),
                    duration: ShareDuration::Hours1,
                    ..text_share("new")
                },
                t0(),
            )
            .unwrap();
        assert_eq!(
            registry.code_status_at("SAME", t0()),
            Some(ShareStatus::Active)
        );
        assert_eq!(
            registry.code_status_at("SAME", t0() + Duration::hours(2)),
            Some(ShareStatus::Expired)
        );
    }
}
