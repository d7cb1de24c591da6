use ahash::AHashMap;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::hierarchy::FolderIndex;
use super::tracker::ProgressTracker;
use super::PipelineContext;
use crate::classifier::{classify_or_fallback, FALLBACK_CATEGORY};
use crate::config::AppConfig;
use crate::error::Error;
use crate::hasher::content_hash;
use crate::scanner::FileDescriptor;
use crate::storage::{Category, NewFile};

/// Live category names offered to the classifier, and their ids.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    names: Vec<String>,
    ids: AHashMap<String, i64>,
}

impl CategoryIndex {
    pub fn from_categories(categories: &[Category]) -> Self {
        let mut index = Self::default();
        for category in categories.iter().filter(|c| !c.deleted) {
            let key = category.name.to_lowercase();
            if index.ids.insert(key, category.id).is_none() {
                index.names.push(category.name.clone());
            }
        }
        index
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Case-insensitive name lookup.
    pub fn resolve(&self, name: &str) -> Option<i64> {
        self.ids.get(&name.to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Completions counted by the progress tracker.
    pub processed: usize,
    pub stored: usize,
    pub failed: usize,
    /// Files that ended up with only the fallback category.
    pub uncategorized: usize,
}

/// Fixed-size pool that upserts and classifies every discovered file once.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    max_workers: usize,
    progress_interval: usize,
    compute_hashes: bool,
}

impl WorkerPool {
    pub fn new(max_workers: usize, progress_interval: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            progress_interval: progress_interval.max(1),
            compute_hashes: false,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.max_workers, config.progress_interval)
            .with_compute_hashes(config.compute_hashes)
    }

    pub fn with_compute_hashes(mut self, compute_hashes: bool) -> Self {
        self.compute_hashes = compute_hashes;
        self
    }

    /// Process `files` on a dedicated thread pool and block until all are done.
    ///
    /// A per-file failure is logged and counted; it never aborts the batch.
    /// The only error returned is a failure to build the pool itself.
    pub fn run(
        &self,
        ctx: &PipelineContext<'_>,
        job_id: i64,
        files: &[FileDescriptor],
        folders: &FolderIndex,
        categories: &CategoryIndex,
    ) -> Result<WorkerStats, Error> {
        let start = Instant::now();
        let total = files.len();

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .thread_name(|i| format!("classify-{}", i))
            .build()?;

        info!(
            files = total,
            workers = self.max_workers,
            categories = categories.len(),
            "Starting classification"
        );
        ctx.reporter.on_classify_start(total);

        let stored = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let uncategorized = AtomicUsize::new(0);
        let sent = AtomicUsize::new(0);

        let tracker = ProgressTracker::new(
            ctx.store,
            ctx.reporter,
            job_id,
            total,
            self.progress_interval,
        );
        let (tx, rx) = mpsc::channel::<()>();

        let processed = thread::scope(|scope| {
            let handle = scope.spawn(move || tracker.run(rx));

            pool.install(|| {
                files.par_iter().for_each_with(tx, |tx, file| {
                    match self.process_file(ctx, file, folders, categories) {
                        Ok(fell_back) => {
                            stored.fetch_add(1, Ordering::Relaxed);
                            if fell_back {
                                uncategorized.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                        Err(e) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                            error!(file = %file.path.display(), "Failed to process file: {}", e);
                        }
                    }
                    sent.fetch_add(1, Ordering::Relaxed);
                    // The tracker only exits once every sender is gone.
                    let _ = tx.send(());
                });
            });

            handle.join().unwrap_or_else(|_| {
                let counted = sent.load(Ordering::Relaxed);
                error!(job_id, processed = counted, "Progress tracker panicked");
                counted
            })
        });

        let stats = WorkerStats {
            processed,
            stored: stored.into_inner(),
            failed: failed.into_inner(),
            uncategorized: uncategorized.into_inner(),
        };
        let elapsed = start.elapsed().as_secs_f64();
        info!(
            processed = stats.processed,
            stored = stats.stored,
            failed = stats.failed,
            uncategorized = stats.uncategorized,
            elapsed_secs = elapsed,
            "Classification complete"
        );
        ctx.reporter.on_classify_complete(stats.processed, elapsed);
        Ok(stats)
    }

    /// Returns whether the file fell back to the default category.
    fn process_file(
        &self,
        ctx: &PipelineContext<'_>,
        file: &FileDescriptor,
        folders: &FolderIndex,
        categories: &CategoryIndex,
    ) -> Result<bool, Error> {
        let folder_id = match file.folder_path.as_deref() {
            Some(folder_path) => {
                let id = folders.get(folder_path);
                if id.is_none() {
                    warn!(
                        file = %file.path.display(),
                        folder = %folder_path.display(),
                        "Folder id not found; storing file at root"
                    );
                }
                id
            }
            None => None,
        };

        let hash = if self.compute_hashes {
            match content_hash(&file.path) {
                Ok(digest) => Some(digest),
                Err(e) => {
                    warn!(file = %file.path.display(), "Failed to hash file: {}", e);
                    None
                }
            }
        } else {
            file.hash.clone()
        };

        let record = ctx.store.upsert_file(&NewFile {
            path: file.path.to_string_lossy().into_owned(),
            file_name: file.file_name.clone(),
            file_type: file.file_type,
            size: i64::try_from(file.size).unwrap_or(i64::MAX),
            modified_at: file.modified_at,
            hash,
            folder_id,
        })?;

        let names = classify_or_fallback(ctx.classifier, &file.file_name, categories.names());
        let mut category_ids: Vec<i64> = names
            .iter()
            .filter_map(|name| {
                let id = categories.resolve(name);
                if id.is_none() {
                    warn!(file = %file.file_name, category = %name, "Unknown category name");
                }
                id
            })
            .collect();

        let fallback_id = categories.resolve(FALLBACK_CATEGORY);
        if category_ids.is_empty() {
            category_ids.extend(fallback_id);
        }
        let fell_back =
            !category_ids.is_empty() && category_ids.iter().all(|id| Some(*id) == fallback_id);

        ctx.store.replace_file_categories(&[record.id], &category_ids)?;
        debug!(
            file = %file.file_name,
            file_id = record.id,
            categories = ?names,
            "Stored file"
        );
        Ok(fell_back)
    }
}
