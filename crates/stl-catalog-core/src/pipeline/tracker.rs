use std::sync::mpsc::Receiver;
use tracing::{debug, warn};

use crate::progress::ProgressReporter;
use crate::storage::{CatalogStore, JobUpdate};

/// Percentage reported once the folder hierarchy is persisted.
pub const HIERARCHY_DONE_PERCENT: u8 = 10;
/// Percentage span covered by the worker phase.
const WORKER_SPAN_PERCENT: usize = 80;

/// Sole owner of the processed counter during the worker phase.
///
/// Workers send one `()` per finished file; the tracker counts them and writes
/// throttled `running` updates to the job row.
pub struct ProgressTracker<'a> {
    store: &'a dyn CatalogStore,
    reporter: &'a dyn ProgressReporter,
    job_id: i64,
    total: usize,
    interval: usize,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(
        store: &'a dyn CatalogStore,
        reporter: &'a dyn ProgressReporter,
        job_id: i64,
        total: usize,
        interval: usize,
    ) -> Self {
        Self {
            store,
            reporter,
            job_id,
            total,
            interval: interval.max(1),
        }
    }

    /// Map `processed` onto the 10–90% band.
    pub fn percent(&self, processed: usize) -> u8 {
        if self.total == 0 {
            return (HIERARCHY_DONE_PERCENT as usize + WORKER_SPAN_PERCENT) as u8;
        }
        let processed = processed.min(self.total);
        (HIERARCHY_DONE_PERCENT as usize + processed * WORKER_SPAN_PERCENT / self.total) as u8
    }

    /// Drain completions until every sender is dropped. Returns the final count.
    pub fn run(self, completions: Receiver<()>) -> usize {
        let mut processed = 0;
        let mut last_emitted = 0;

        for () in completions.iter() {
            processed += 1;
            self.reporter.on_classify_progress(processed, self.total);

            if processed % self.interval == 0 || processed == self.total {
                self.emit(processed);
                last_emitted = processed;
            }
        }

        if processed != last_emitted {
            self.emit(processed);
        }
        processed
    }

    fn emit(&self, processed: usize) {
        let percent = self.percent(processed);
        debug!(job_id = self.job_id, processed, percent, "Progress update");
        let update = JobUpdate::running(self.total, processed, percent);
        if let Err(e) = self.store.update_scan_job(self.job_id, &update) {
            warn!(job_id = self.job_id, "Failed to write progress update: {}", e);
        }
    }
}
