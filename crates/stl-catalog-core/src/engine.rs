use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::classifier::{
    classify_or_fallback, Classifier, ClassifierError, OpenAiClassifier, FALLBACK_CATEGORY,
};
use crate::config::AppConfig;
use crate::error::Error;
use crate::pipeline::{
    build_hierarchy, CategoryIndex, PipelineContext, WorkerPool, HIERARCHY_DONE_PERCENT,
};
use crate::progress::ProgressReporter;
use crate::scanner::{CancelToken, Crawler};
use crate::storage::{CatalogStore, Category, JobUpdate};

/// Percentage reported once the crawl has finished.
const CRAWL_DONE_PERCENT: u8 = 5;

pub struct ScanEngine {
    config: AppConfig,
    classifier: Arc<dyn Classifier>,
}

#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub job_id: i64,
    pub found: usize,
    pub processed: usize,
    pub stored: usize,
    pub failed: usize,
    pub uncategorized: usize,
    pub folders_created: usize,
    pub folders_reconciled: usize,
    pub crawl_duration: Duration,
    pub hierarchy_duration: Duration,
    pub classify_duration: Duration,
}

impl ScanEngine {
    pub fn new(config: AppConfig, classifier: Arc<dyn Classifier>) -> Self {
        Self { config, classifier }
    }

    /// Engine with the HTTP classifier configured from `openai_api_key`.
    pub fn from_config(config: AppConfig) -> Self {
        let classifier =
            OpenAiClassifier::new(config.openai_api_key.clone(), config.openai_model.clone());
        if !classifier.is_enabled() {
            info!("No classifier API key configured; files will be uncategorized");
        }
        Self::new(config, Arc::new(classifier))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn crawler(&self) -> Crawler {
        Crawler::new(&self.config.root_dir, &self.config.supported_exts)
            .with_excluded_dir_names(&self.config.excluded_dir_names)
            .with_ignore_patterns(&self.config.ignore_patterns)
    }

    /// Create a `running` job with zeroed counters.
    pub fn start_scan(&self, store: &dyn CatalogStore) -> Result<i64, Error> {
        let job_id = store.create_scan_job()?;
        info!(job_id, root = %self.config.root_dir, "Created scan job");
        Ok(job_id)
    }

    /// Create a job and run it to a terminal state.
    pub fn scan(
        &self,
        store: &dyn CatalogStore,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanSummary, Error> {
        let job_id = self.start_scan(store)?;
        self.run_scan(store, job_id, cancel, reporter)
    }

    /// Run the crawl → hierarchy → workers pipeline for an existing job.
    ///
    /// Phase-fatal errors mark the job `failed` with the error text and are
    /// returned. Per-file failures are logged and the job still completes.
    pub fn run_scan(
        &self,
        store: &dyn CatalogStore,
        job_id: i64,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanSummary, Error> {
        let mut found = 0;
        match self.execute(store, job_id, cancel, reporter, &mut found) {
            Ok(summary) => {
                let update = JobUpdate::completed(summary.found, summary.processed);
                if let Err(e) = store.update_scan_job(job_id, &update) {
                    error!(job_id, "Failed to mark scan job as completed: {}", e);
                    let failed = JobUpdate::failed(summary.found, e.to_string());
                    if let Err(update_err) = store.update_scan_job(job_id, &failed) {
                        error!(job_id, "Failed to mark scan job as failed: {}", update_err);
                    }
                    return Err(e);
                }
                info!(
                    job_id,
                    found = summary.found,
                    processed = summary.processed,
                    failed = summary.failed,
                    "Scan completed"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(job_id, "Scan failed: {}", e);
                if let Err(update_err) =
                    store.update_scan_job(job_id, &JobUpdate::failed(found, e.to_string()))
                {
                    error!(job_id, "Failed to mark scan job as failed: {}", update_err);
                }
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        store: &dyn CatalogStore,
        job_id: i64,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
        found: &mut usize,
    ) -> Result<ScanSummary, Error> {
        store.ensure_category(FALLBACK_CATEGORY)?;

        // Phase 1: Crawl
        let crawler = self.crawler();
        let root = crawler.root().to_path_buf();
        info!(root = %root.display(), "Crawling...");
        reporter.on_crawl_start(&root.to_string_lossy());
        let crawl_start = Instant::now();
        let files = match crawler.crawl(cancel, reporter) {
            Ok(files) => files,
            Err(aborted) => {
                *found = aborted.partial.len();
                return Err(aborted.into());
            }
        };
        let crawl_duration = crawl_start.elapsed();
        *found = files.len();
        reporter.on_crawl_complete(files.len(), crawl_duration.as_secs_f64());
        info!(
            found = files.len(),
            elapsed_secs = crawl_duration.as_secs_f64(),
            "Crawl complete"
        );
        store.update_scan_job(job_id, &JobUpdate::running(files.len(), 0, CRAWL_DONE_PERCENT))?;

        // Phase 2: Folder hierarchy
        let hierarchy_start = Instant::now();
        let hierarchy = build_hierarchy(store, &files, &root)?;
        let hierarchy_duration = hierarchy_start.elapsed();
        reporter.on_hierarchy_complete(hierarchy.folders.len(), hierarchy_duration.as_secs_f64());
        debug!(
            created = hierarchy.created,
            reconciled = hierarchy.reconciled,
            unchanged = hierarchy.unchanged,
            "Folder hierarchy persisted"
        );
        store.update_scan_job(
            job_id,
            &JobUpdate::running(files.len(), 0, HIERARCHY_DONE_PERCENT),
        )?;

        // Phase 3: Upsert and classify
        let categories = self.load_categories(store)?;
        let ctx = PipelineContext {
            store,
            classifier: self.classifier.as_ref(),
            reporter,
        };
        let classify_start = Instant::now();
        let stats = if files.is_empty() {
            Default::default()
        } else {
            WorkerPool::from_config(&self.config).run(
                &ctx,
                job_id,
                &files,
                &hierarchy.folders,
                &categories,
            )?
        };

        Ok(ScanSummary {
            job_id,
            found: files.len(),
            processed: stats.processed,
            stored: stats.stored,
            failed: stats.failed,
            uncategorized: stats.uncategorized,
            folders_created: hierarchy.created,
            folders_reconciled: hierarchy.reconciled,
            crawl_duration,
            hierarchy_duration,
            classify_duration: classify_start.elapsed(),
        })
    }

    /// Live categories for the classifier. Falls back to the default category
    /// alone when the list cannot be read.
    fn load_categories(&self, store: &dyn CatalogStore) -> Result<CategoryIndex, Error> {
        match store.list_categories() {
            Ok(categories) => Ok(CategoryIndex::from_categories(&categories)),
            Err(e) => {
                warn!("Failed to load categories, using fallback only: {}", e);
                let fallback = store.ensure_category(FALLBACK_CATEGORY)?;
                Ok(CategoryIndex::from_categories(&[fallback]))
            }
        }
    }

    /// Re-run the classifier for one stored file and replace its categories.
    pub fn reclassify_file(
        &self,
        store: &dyn CatalogStore,
        file_id: i64,
    ) -> Result<Vec<Category>, Error> {
        if !self.classifier.is_enabled() {
            return Err(ClassifierError::Disabled.into());
        }
        let file = store
            .get_file(file_id)?
            .ok_or_else(|| Error::NotFound(format!("file {}", file_id)))?;

        let fallback = store.ensure_category(FALLBACK_CATEGORY)?;
        let categories = self.load_categories(store)?;
        let names =
            classify_or_fallback(self.classifier.as_ref(), &file.file_name, categories.names());

        let mut ids: Vec<i64> = names.iter().filter_map(|n| categories.resolve(n)).collect();
        if ids.is_empty() {
            ids.push(fallback.id);
        }
        store.replace_file_categories(&[file.id], &ids)?;
        info!(file_id, file = %file.file_name, categories = ?names, "Reclassified file");
        store.get_file_categories(file.id)
    }

    /// Replace a file's categories with an explicit id list.
    pub fn set_file_categories(
        &self,
        store: &dyn CatalogStore,
        file_id: i64,
        category_ids: &[i64],
    ) -> Result<Vec<Category>, Error> {
        if store.get_file(file_id)?.is_none() {
            return Err(Error::NotFound(format!("file {}", file_id)));
        }
        let live: Vec<i64> = store.list_categories()?.iter().map(|c| c.id).collect();
        if let Some(unknown) = category_ids.iter().copied().find(|id| !live.contains(id)) {
            return Err(Error::InvalidInput(format!("unknown category id {}", unknown)));
        }
        store.replace_file_categories(&[file_id], category_ids)?;
        store.get_file_categories(file_id)
    }
}
