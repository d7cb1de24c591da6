use ahash::{AHashMap, AHashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::error::Error;
use crate::scanner::{parent_folder, FileDescriptor};
use crate::storage::CatalogStore;

/// Path → folder id map produced by [`build_hierarchy`]. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct FolderIndex {
    ids: AHashMap<PathBuf, i64>,
}

impl FolderIndex {
    pub fn get(&self, path: &Path) -> Option<i64> {
        self.ids.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, i64)> {
        self.ids.iter().map(|(path, id)| (path.as_path(), *id))
    }
}

#[derive(Debug, Default)]
pub struct HierarchyOutcome {
    pub folders: FolderIndex,
    pub created: usize,
    pub reconciled: usize,
    pub unchanged: usize,
}

fn depth(path: &Path) -> usize {
    path.components().count()
}

/// Every folder that holds a file or is an ancestor of one, below `root`,
/// ordered shallowest first. Ties are broken by path.
pub fn plan_folders(files: &[FileDescriptor], root: &Path) -> Vec<PathBuf> {
    let mut wanted: AHashSet<PathBuf> = AHashSet::new();

    for file in files {
        let Some(folder_path) = file.folder_path.as_deref() else {
            continue;
        };
        // Stop climbing as soon as an ancestor is already known: its own
        // ancestors were added when it was.
        if !wanted.insert(folder_path.to_path_buf()) {
            continue;
        }
        let mut current = folder_path.to_path_buf();
        while let Some((parent, _)) = parent_folder(&current, root) {
            if !wanted.insert(parent.clone()) {
                break;
            }
            current = parent;
        }
    }

    let mut ordered: Vec<PathBuf> = wanted.into_iter().collect();
    ordered.sort_by(|a, b| depth(a).cmp(&depth(b)).then_with(|| a.cmp(b)));
    ordered
}

/// Persist the minimal folder tree for `files` and return the path → id map.
///
/// Folders are processed shallowest first so a parent's id is always cached
/// before any child asks for it. Existing rows are reconciled in place when
/// their parent link has drifted. A failed create or reconcile is logged and
/// skipped; a failed lookup aborts the build.
pub fn build_hierarchy(
    store: &dyn CatalogStore,
    files: &[FileDescriptor],
    root: &Path,
) -> Result<HierarchyOutcome, Error> {
    let ordered = plan_folders(files, root);
    info!(count = ordered.len(), "Discovered folders with files");

    let mut outcome = HierarchyOutcome::default();
    let mut cache: AHashMap<PathBuf, i64> = AHashMap::with_capacity(ordered.len());

    for folder_path in &ordered {
        let path_str = folder_path.to_string_lossy();

        let parent = parent_folder(folder_path, root).map(|(parent, _)| parent);
        let parent_id = match parent.as_deref() {
            Some(parent_path) => match cache.get(parent_path) {
                Some(&id) => Some(id),
                None => {
                    error!(
                        folder = %path_str,
                        parent = %parent_path.display(),
                        "Parent folder missing from cache; storing folder without parent"
                    );
                    None
                }
            },
            None => None,
        };

        if let Some(existing) = store.get_folder_by_path(&path_str)? {
            if existing.parent_id != parent_id {
                debug!(
                    folder = %path_str,
                    old_parent = ?existing.parent_id,
                    new_parent = ?parent_id,
                    "Updating folder parent"
                );
                match store.update_folder_parent(existing.id, parent_id) {
                    Ok(()) => outcome.reconciled += 1,
                    Err(e) => error!(folder = %path_str, "Failed to update folder parent: {}", e),
                }
            } else {
                outcome.unchanged += 1;
            }
            cache.insert(folder_path.clone(), existing.id);
            continue;
        }

        let name = folder_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_str.to_string());

        match store.create_folder(&name, &path_str, parent_id) {
            Ok(created) => {
                debug!(
                    name = %name,
                    folder = %path_str,
                    has_parent = parent_id.is_some(),
                    "Created folder"
                );
                cache.insert(folder_path.clone(), created.id);
                outcome.created += 1;
            }
            Err(e) => error!(folder = %path_str, "Failed to create folder: {}", e),
        }
    }

    outcome.folders = FolderIndex { ids: cache };
    Ok(outcome)
}
