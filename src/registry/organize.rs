//! Grouping of uploaded files into a folder-aware listing.

use super::model::FileItem;

/// Order files for display: root-level files first, then for each top-level
/// folder (in order of first appearance) a synthetic folder row followed by
/// its member files. The folder row's size is the sum of its members.
pub fn organize_files(files: Vec<FileItem>) -> Vec<FileItem> {
    let mut root = Vec::new();
    let mut groups: Vec<(String, Vec<FileItem>)> = Vec::new();

    for file in files.into_iter().filter(|f| f.is_file()) {
        match top_level_folder(&file.path).map(str::to_string) {
            Some(top) => {
                match groups.iter_mut().find(|(name, _)| *name == top) {
                    Some((_, members)) => members.push(file),
                    None => groups.push((top, vec![file])),
                }
            }
            None => root.push(file),
        }
    }

    let mut organized = root;
    for (name, members) in groups {
        let size = members.iter().map(|f| f.size).sum();
        organized.push(FileItem::folder(name, size));
        organized.extend(members);
    }
    organized
}

/// Top-level folder of a path, if it has one.
pub fn top_level_folder(path: &str) -> Option<&str> {
    path.split_once('/').map(|(top, _)| top)
}
