/// Trait for reporting scan progress.
///
/// The CLI implements it with indicatif bars; the engine and pipeline call it
/// from the crawl thread, the scan thread and the progress tracker thread.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_crawl_start(&self, _root: &str) {}
    fn on_crawl_progress(&self, _files_found: usize, _current_path: &str) {}
    fn on_crawl_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_hierarchy_complete(&self, _folders: usize, _duration_secs: f64) {}
    fn on_classify_start(&self, _total_files: usize) {}
    fn on_classify_progress(&self, _processed: usize, _total_files: usize) {}
    fn on_classify_complete(&self, _processed: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
