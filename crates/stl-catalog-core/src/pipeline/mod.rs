//! Post-crawl scan phases: persist the folder tree, then upsert and classify
//! every file on a bounded worker pool while a single tracker reports progress.

mod hierarchy;
mod tracker;
mod workers;

pub use hierarchy::{build_hierarchy, plan_folders, FolderIndex, HierarchyOutcome};
pub use tracker::{ProgressTracker, HIERARCHY_DONE_PERCENT};
pub use workers::{CategoryIndex, WorkerPool, WorkerStats};

use crate::classifier::Classifier;
use crate::progress::ProgressReporter;
use crate::storage::CatalogStore;

/// Collaborators shared by every phase of one scan.
#[derive(Clone, Copy)]
pub struct PipelineContext<'a> {
    pub store: &'a dyn CatalogStore,
    pub classifier: &'a dyn Classifier,
    pub reporter: &'a dyn ProgressReporter,
}
