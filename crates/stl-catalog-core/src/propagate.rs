use ahash::AHashSet;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::scanner::FileType;
use crate::storage::CatalogStore;

/// Which children of a folder receive its categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PropagationScope {
    pub stl: bool,
    pub zip: bool,
    pub rar: bool,
    /// Immediate subfolders only.
    pub subfolders: bool,
}

impl PropagationScope {
    pub fn all() -> Self {
        Self {
            stl: true,
            zip: true,
            rar: true,
            subfolders: true,
        }
    }

    pub fn applies_to(&self, file_type: FileType) -> bool {
        match file_type {
            FileType::Stl => self.stl,
            FileType::Zip => self.zip,
            FileType::Rar => self.rar,
        }
    }

    pub fn includes_files(&self) -> bool {
        self.stl || self.zip || self.rar
    }

    pub fn is_empty(&self) -> bool {
        !self.includes_files() && !self.subfolders
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PropagationReport {
    pub files_updated: usize,
    pub subfolders_updated: usize,
}

/// Replace the categories of a folder's direct children with `category_ids`.
///
/// Files are selected by type flag; subfolders are one level deep and their
/// own contents are left alone. Unknown or soft-deleted ids are dropped.
pub fn propagate_categories(
    store: &dyn CatalogStore,
    folder_id: i64,
    category_ids: &[i64],
    scope: PropagationScope,
) -> Result<PropagationReport, Error> {
    require_folder(store, folder_id)?;
    if scope.is_empty() {
        debug!(folder_id, "Empty propagation scope; nothing to do");
        return Ok(PropagationReport::default());
    }
    let category_ids = live_category_ids(store, category_ids)?;
    apply(store, folder_id, &category_ids, scope)
}

/// Set a folder's own categories, then propagate them within `scope`.
pub fn update_folder_categories(
    store: &dyn CatalogStore,
    folder_id: i64,
    category_ids: &[i64],
    scope: PropagationScope,
) -> Result<PropagationReport, Error> {
    require_folder(store, folder_id)?;
    let category_ids = live_category_ids(store, category_ids)?;

    store.replace_folder_categories(&[folder_id], &category_ids)?;
    debug!(folder_id, categories = ?category_ids, "Updated folder categories");

    if scope.is_empty() {
        return Ok(PropagationReport::default());
    }
    apply(store, folder_id, &category_ids, scope)
}

fn require_folder(store: &dyn CatalogStore, folder_id: i64) -> Result<(), Error> {
    match store.get_folder(folder_id)? {
        Some(_) => Ok(()),
        None => Err(Error::NotFound(format!("folder {}", folder_id))),
    }
}

fn live_category_ids(store: &dyn CatalogStore, requested: &[i64]) -> Result<Vec<i64>, Error> {
    let live: AHashSet<i64> = store.list_categories()?.into_iter().map(|c| c.id).collect();
    let mut seen = AHashSet::new();
    Ok(requested
        .iter()
        .copied()
        .filter(|id| {
            if !live.contains(id) {
                warn!(category_id = id, "Skipping unknown or deleted category");
                return false;
            }
            seen.insert(*id)
        })
        .collect())
}

fn apply(
    store: &dyn CatalogStore,
    folder_id: i64,
    category_ids: &[i64],
    scope: PropagationScope,
) -> Result<PropagationReport, Error> {
    let mut report = PropagationReport::default();

    if scope.includes_files() {
        let file_ids: Vec<i64> = store
            .list_folder_files(folder_id)?
            .into_iter()
            .filter(|file| scope.applies_to(file.file_type))
            .map(|file| file.id)
            .collect();
        if !file_ids.is_empty() {
            store.replace_file_categories(&file_ids, category_ids)?;
        }
        report.files_updated = file_ids.len();
    }

    if scope.subfolders {
        let subfolder_ids: Vec<i64> = store
            .list_subfolders(folder_id)?
            .into_iter()
            .map(|folder| folder.id)
            .collect();
        if !subfolder_ids.is_empty() {
            store.replace_folder_categories(&subfolder_ids, category_ids)?;
        }
        report.subfolders_updated = subfolder_ids.len();
    }

    info!(
        folder_id,
        files = report.files_updated,
        subfolders = report.subfolders_updated,
        "Propagated categories"
    );
    Ok(report)
}
