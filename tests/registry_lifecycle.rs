//! Lifecycle tests for the share registry.
//!
//! These exercise create / lookup / burn / expiry / removal through the public
//! API, and check that state survives a reload from both storage backends.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use stashcode::registry::{
    FileItem, LookupError, NewShare, ShareDuration, ShareRegistry, ShareStatus, SHARES_KEY,
};
use stashcode::storage::{KeyValueStore, MemoryStore, SqliteStore};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

fn docs_files() -> Vec<FileItem> {
    vec![
        FileItem::file("a.txt", "a.txt", 4, "/d/1"),
        FileItem::file("readme.md", "docs/readme.md", 4, "/d/2"),
        FileItem::file("notes.txt", "docs/notes.txt", 5, "/d/3"),
    ]
}

// ============================================================================
// Creation
// ============================================================================

#[test]
fn test_text_only_share_one_hour() {
    let mut registry = ShareRegistry::load(MemoryStore::new());

    let created = registry
        .create_at(
            NewShare {
                text_content: Some("meeting notes".to_string()),
                duration: ShareDuration::Hours1,
                ..Default::default()
            },
            t0(),
        )
        .unwrap();

    assert!(created.files.is_empty());
    assert_eq!(created.text_content.as_deref(), Some("meeting notes"));
    assert_eq!(created.expires_at - created.created_at, Duration::hours(1));
    assert_eq!(created.access_code.len(), 8);
    assert!(created
        .access_code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
}

#[test]
fn test_default_expiry_is_24_hours() {
    let mut registry = ShareRegistry::load(MemoryStore::new());
    let created = registry
        .create_at(
            NewShare {
                files: docs_files(),
                ..Default::default()
            },
            t0(),
        )
        .unwrap();

    let ms = (created.expires_at - created.created_at).num_milliseconds();
    assert_eq!(ms, 86_400_000);
}

#[test]
fn test_created_files_are_grouped_under_folders() {
    let mut registry = ShareRegistry::load(MemoryStore::new());
    let created = registry
        .create(NewShare {
            files: docs_files(),
            ..Default::default()
        })
        .unwrap();

    let rows: Vec<(&str, bool, u64)> = created
        .files
        .iter()
        .map(|f| (f.path.as_str(), f.is_folder(), f.size))
        .collect();

    assert_eq!(
        rows,
        vec![
            ("a.txt", false, 4),
            ("docs", true, 9),
            ("docs/readme.md", false, 4),
            ("docs/notes.txt", false, 5),
        ]
    );
    assert_eq!(created.file_rows().count(), 3);
}

#[test]
fn test_generated_codes_differ() {
    let mut registry = ShareRegistry::load(MemoryStore::new());
    let a = registry
        .create(NewShare {
            text_content: Some("a".to_string()),
            ..Default::default()
        })
        .unwrap();
    let b = registry
        .create(NewShare {
            text_content: Some("b".to_string()),
            ..Default::default()
        })
        .unwrap();

    assert_ne!(a.access_code, b.access_code);
    assert_ne!(a.id, b.id);
}

// ============================================================================
// Lookup, burn and expiry
// ============================================================================

#[test]
fn test_burn_after_reading_single_use() {
    let mut registry = ShareRegistry::load(MemoryStore::new());
    let created = registry
        .create(NewShare {
            text_content: Some("secret".to_string()),
            burn_after_reading: true,
            ..Default::default()
        })
        .unwrap();

    let first = registry.find_by_code(&created.access_code).unwrap();
    assert_eq!(first.text_content.as_deref(), Some("secret"));

    assert_eq!(
        registry.find_by_code(&created.access_code),
        Err(LookupError::Deleted(created.access_code.clone()))
    );
    assert_eq!(
        registry.get(created.id).map(|f| f.status_at(Utc::now())),
        Some(ShareStatus::Deleted)
    );
}

#[test]
fn test_plain_share_survives_repeated_lookups() {
    let mut registry = ShareRegistry::load(MemoryStore::new());
    let created = registry
        .create(NewShare {
            text_content: Some("reusable".to_string()),
            ..Default::default()
        })
        .unwrap();

    for _ in 0..3 {
        assert!(registry.find_by_code(&created.access_code).is_ok());
    }
}

#[test]
fn test_expired_share_reports_expired_until_deleted() {
    let mut registry = ShareRegistry::load(MemoryStore::new());
    let created = registry
        .create_at(
            NewShare {
                text_content: Some("x".to_string()),
                duration: ShareDuration::Hours6,
                ..Default::default()
            },
            t0(),
        )
        .unwrap();

    let later = t0() + Duration::hours(6);
    assert_eq!(
        registry.find_by_code_at(&created.access_code, later),
        Err(LookupError::Expired(created.access_code.clone()))
    );

    registry.mark_deleted(created.id);
    assert_eq!(
        registry.find_by_code_at(&created.access_code, later),
        Err(LookupError::Deleted(created.access_code.clone()))
    );
}

#[test]
fn test_unknown_code_not_found() {
    let mut registry = ShareRegistry::load(MemoryStore::new());
    assert_eq!(
        registry.find_by_code("NOPE0000"),
        Err(LookupError::NotFound("NOPE0000".to_string()))
    );
}

#[test]
fn test_newest_record_wins_on_code_collision() {
    let mut registry = ShareRegistry::load(MemoryStore::new());
    for text in ["first", "second"] {
        registry
            .create(NewShare {
                text_content: Some(text.to_string()),
                access_code: Some("SAME".to_string()),
                ..Default::default()
            })
            .unwrap();
    }

    let found = registry.find_by_code("SAME").unwrap();
    assert_eq!(found.text_content.as_deref(), Some("second"));
    assert_eq!(registry.len(), 2);
}

// ============================================================================
// Removal and listing
// ============================================================================

#[test]
fn test_remove_then_lookup_not_found() {
    let mut registry = ShareRegistry::load(MemoryStore::new());
    let created = registry
        .create(NewShare {
            text_content: Some("x".to_string()),
            ..Default::default()
        })
        .unwrap();

    assert!(registry.remove(created.id).is_some());
    assert!(registry.remove(created.id).is_none());
    assert_eq!(
        registry.find_by_code(&created.access_code),
        Err(LookupError::NotFound(created.access_code.clone()))
    );
}

#[test]
fn test_list_with_status_and_purge() {
    let mut registry = ShareRegistry::load(MemoryStore::new());
    let text = |t: &str, d| NewShare {
        text_content: Some(t.to_string()),
        duration: d,
        ..Default::default()
    };

    let active = registry
        .create_at(text("active", ShareDuration::Days7), t0())
        .unwrap();
    registry
        .create_at(text("expired", ShareDuration::Hours1), t0())
        .unwrap();
    let revoked = registry
        .create_at(text("revoked", ShareDuration::Days7), t0())
        .unwrap();
    assert!(registry.mark_deleted(revoked.id));
    assert!(!registry.mark_deleted(revoked.id));

    let now = t0() + Duration::hours(2);
    let statuses: Vec<ShareStatus> = registry
        .list_with_status(now)
        .iter()
        .map(|l| l.status)
        .collect();
    assert_eq!(
        statuses,
        vec![ShareStatus::Active, ShareStatus::Expired, ShareStatus::Deleted]
    );

    assert_eq!(registry.purge_inactive(now), 2);
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.list()[0].id, active.id);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_state_survives_reload_from_shared_store() {
    let store = Arc::new(MemoryStore::new());

    let (burned, kept) = {
        let mut registry = ShareRegistry::load(Arc::clone(&store));
        let burned = registry
            .create(NewShare {
                text_content: Some("once".to_string()),
                burn_after_reading: true,
                ..Default::default()
            })
            .unwrap();
        let kept = registry
            .create(NewShare {
                files: docs_files(),
                ..Default::default()
            })
            .unwrap();
        registry.find_by_code(&burned.access_code).unwrap();
        (burned, kept)
    };

    let mut reloaded = ShareRegistry::load(Arc::clone(&store));
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.get(kept.id), Some(&kept));
    assert!(matches!(
        reloaded.find_by_code(&burned.access_code),
        Err(LookupError::Deleted(_))
    ));
}

#[test]
fn test_persisted_layout_uses_camel_case() {
    let store = Arc::new(MemoryStore::new());
    let mut registry = ShareRegistry::load(Arc::clone(&store));
    registry
        .create(NewShare {
            files: docs_files(),
            burn_after_reading: true,
            ..Default::default()
        })
        .unwrap();

    let raw = store.read(SHARES_KEY).unwrap().expect("slot written");
    let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    let record = &json[0];

    for field in [
        "id",
        "name",
        "accessCode",
        "files",
        "createdAt",
        "expiresAt",
        "burnAfterReading",
        "isDeleted",
    ] {
        assert!(record.get(field).is_some(), "missing field {}", field);
    }
    assert!(record.get("textContent").is_none());
    assert_eq!(record["files"][1]["type"], "folder");
}

#[test]
fn test_state_survives_sqlite_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("state").join("stashcode.db");

    let created = {
        let store = SqliteStore::open(&db_path).unwrap();
        let mut registry = ShareRegistry::load(store);
        registry
            .create(NewShare {
                text_content: Some("persisted".to_string()),
                duration: ShareDuration::Days30,
                ..Default::default()
            })
            .unwrap()
    };

    let store = SqliteStore::open(&db_path).unwrap();
    let mut registry = ShareRegistry::load(store);
    let found = registry.find_by_code(&created.access_code).unwrap();
    assert_eq!(found, created);
}
