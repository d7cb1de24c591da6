use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use stl_catalog_core::ProgressReporter;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Crawl phase: spinner (total unknown until the walk ends)
/// - Classify phase: progress bar over the crawled file count
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.lock();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.lock().take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_crawl_start(&self, root: &str) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars(TICK_CHARS),
        );
        pb.set_message(format!("Crawling {}...", root));
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_crawl_progress(&self, files_found: usize, _current_path: &str) {
        if let Some(pb) = self.lock().as_ref() {
            pb.set_message(format!("Crawling... {} files found", files_found));
        }
    }

    fn on_crawl_complete(&self, total_files: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Crawl complete: {} files in {:.2}s",
            total_files, duration_secs
        );
    }

    fn on_hierarchy_complete(&self, folders: usize, duration_secs: f64) {
        eprintln!(
            "  \x1b[32m✓\x1b[0m Folder tree stored: {} folders in {:.2}s",
            folders, duration_secs
        );
    }

    fn on_classify_start(&self, total_files: usize) {
        let pb = ProgressBar::new(total_files as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} Classifying [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining)",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars(TICK_CHARS),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_classify_progress(&self, processed: usize, _total_files: usize) {
        if let Some(pb) = self.lock().as_ref() {
            pb.set_position(processed as u64);
        }
    }

    fn on_classify_complete(&self, processed: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Classification complete: {} files in {:.2}s",
            processed, duration_secs
        );
    }
}
