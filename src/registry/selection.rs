//! Ephemeral file selection within an opened share. Never persisted.

use std::collections::BTreeSet;

use super::model::{FileId, FileItem, SharedFolder};

/// Selected file rows of the share currently being viewed
pub type Selection = BTreeSet<FileId>;

/// Toggle one id in the selection.
pub fn toggle_selection(selected: &mut Selection, id: FileId) {
    if !selected.remove(&id) {
        selected.insert(id);
    }
}

/// Select every file row, or clear the selection if all are already selected.
/// Folder rows are never selectable.
pub fn toggle_select_all(selected: &mut Selection, folder: &SharedFolder) {
    let all: Selection = folder.file_rows().map(|f| f.id).collect();
    if !all.is_empty() && *selected == all {
        selected.clear();
    } else {
        *selected = all;
    }
}

/// File rows of `folder` whose ids are selected, in listing order.
pub fn selected_files<'a>(folder: &'a SharedFolder, selected: &Selection) -> Vec<&'a FileItem> {
    folder
        .file_rows()
        .filter(|f| selected.contains(&f.id))
        .collect()
}

/// A member of a synthetic folder, with its path relative to that folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderMember<'a> {
    pub item: &'a FileItem,
    pub relative_path: &'a str,
}

/// File rows under the top-level folder `name`.
pub fn folder_members<'a>(folder: &'a SharedFolder, name: &str) -> Vec<FolderMember<'a>> {
    folder
        .file_rows()
        .filter_map(|item| {
            let rest = item.path.strip_prefix(name)?.strip_prefix('/')?;
            Some(FolderMember {
                item,
                relative_path: rest,
            })
        })
        .collect()
}
