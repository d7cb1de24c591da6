#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use stl_catalog_core::classifier::{Classifier, ClassifierError};
use stl_catalog_core::storage::{
    Category, FileRecord, FolderRecord, JobStatus, JobUpdate, NewFile, ScanJob,
};
use stl_catalog_core::{AppConfig, CatalogStore, Database, Error};

/// Create `rel` under `root` (and its parent directories) with a few bytes.
pub fn touch(root: &Path, rel: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, format!("solid {}", rel)).unwrap();
    path
}

pub fn config_for(root: &Path, exts: &[&str]) -> AppConfig {
    let mut config = AppConfig::for_root(root.to_string_lossy());
    config.supported_exts = exts.iter().map(|e| e.to_string()).collect();
    config.max_workers = 4;
    config.progress_interval = 2;
    config
}

pub fn names(categories: &[Category]) -> Vec<String> {
    categories.iter().map(|c| c.name.clone()).collect()
}

/// Store error used by the failure switches below.
pub fn injected(message: &str) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::Other, message.to_string()))
}

/// `Database` wrapper that records job updates and folder creation order, and
/// can be told to fail selected operations.
pub struct RecordingStore {
    pub db: Database,
    job_updates: Mutex<Vec<JobUpdate>>,
    created_folders: Mutex<Vec<String>>,
    failing_upserts: Vec<String>,
    failing_folder_creates: Vec<String>,
    fail_folder_lookups: bool,
    fail_completion: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            db: Database::open_in_memory().unwrap(),
            job_updates: Mutex::new(Vec::new()),
            created_folders: Mutex::new(Vec::new()),
            failing_upserts: Vec::new(),
            failing_folder_creates: Vec::new(),
            fail_folder_lookups: false,
            fail_completion: false,
        }
    }

    /// Make `upsert_file` fail for any file whose name is listed.
    pub fn failing_upserts(mut self, file_names: &[&str]) -> Self {
        self.failing_upserts = file_names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Make `create_folder` fail for any listed folder path.
    pub fn failing_folder_creates(mut self, paths: &[&str]) -> Self {
        self.failing_folder_creates = paths.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn failing_folder_lookups(mut self) -> Self {
        self.fail_folder_lookups = true;
        self
    }

    /// Reject the `completed` job update; every other update goes through.
    pub fn failing_completion(mut self) -> Self {
        self.fail_completion = true;
        self
    }

    pub fn job_updates(&self) -> Vec<JobUpdate> {
        self.job_updates.lock().unwrap().clone()
    }

    pub fn created_folders(&self) -> Vec<String> {
        self.created_folders.lock().unwrap().clone()
    }
}

impl CatalogStore for RecordingStore {
    fn create_scan_job(&self) -> Result<i64, Error> {
        CatalogStore::create_scan_job(&self.db)
    }

    fn update_scan_job(&self, job_id: i64, update: &JobUpdate) -> Result<(), Error> {
        self.job_updates.lock().unwrap().push(update.clone());
        if self.fail_completion && update.status == JobStatus::Completed {
            return Err(injected("job table is read-only"));
        }
        CatalogStore::update_scan_job(&self.db, job_id, update)
    }

    fn get_scan_job(&self, job_id: i64) -> Result<Option<ScanJob>, Error> {
        CatalogStore::get_scan_job(&self.db, job_id)
    }

    fn get_folder(&self, folder_id: i64) -> Result<Option<FolderRecord>, Error> {
        CatalogStore::get_folder(&self.db, folder_id)
    }

    fn get_folder_by_path(&self, path: &str) -> Result<Option<FolderRecord>, Error> {
        if self.fail_folder_lookups {
            return Err(injected("folder table unavailable"));
        }
        CatalogStore::get_folder_by_path(&self.db, path)
    }

    fn create_folder(
        &self,
        name: &str,
        path: &str,
        parent_id: Option<i64>,
    ) -> Result<FolderRecord, Error> {
        self.created_folders.lock().unwrap().push(path.to_string());
        if self.failing_folder_creates.iter().any(|p| p == path) {
            return Err(injected(&format!("cannot create {}", path)));
        }
        CatalogStore::create_folder(&self.db, name, path, parent_id)
    }

    fn update_folder_parent(&self, folder_id: i64, parent_id: Option<i64>) -> Result<(), Error> {
        CatalogStore::update_folder_parent(&self.db, folder_id, parent_id)
    }

    fn list_subfolders(&self, folder_id: i64) -> Result<Vec<FolderRecord>, Error> {
        CatalogStore::list_subfolders(&self.db, folder_id)
    }

    fn upsert_file(&self, file: &NewFile) -> Result<FileRecord, Error> {
        if self.failing_upserts.contains(&file.file_name) {
            return Err(injected(&format!("upsert rejected for {}", file.file_name)));
        }
        CatalogStore::upsert_file(&self.db, file)
    }

    fn get_file(&self, file_id: i64) -> Result<Option<FileRecord>, Error> {
        CatalogStore::get_file(&self.db, file_id)
    }

    fn list_folder_files(&self, folder_id: i64) -> Result<Vec<FileRecord>, Error> {
        CatalogStore::list_folder_files(&self.db, folder_id)
    }

    fn list_categories(&self) -> Result<Vec<Category>, Error> {
        CatalogStore::list_categories(&self.db)
    }

    fn ensure_category(&self, name: &str) -> Result<Category, Error> {
        CatalogStore::ensure_category(&self.db, name)
    }

    fn get_file_categories(&self, file_id: i64) -> Result<Vec<Category>, Error> {
        CatalogStore::get_file_categories(&self.db, file_id)
    }

    fn clear_file_categories(&self, file_ids: &[i64]) -> Result<(), Error> {
        CatalogStore::clear_file_categories(&self.db, file_ids)
    }

    fn add_file_categories(&self, file_ids: &[i64], category_ids: &[i64]) -> Result<(), Error> {
        CatalogStore::add_file_categories(&self.db, file_ids, category_ids)
    }

    fn replace_file_categories(
        &self,
        file_ids: &[i64],
        category_ids: &[i64],
    ) -> Result<(), Error> {
        CatalogStore::replace_file_categories(&self.db, file_ids, category_ids)
    }

    fn get_folder_categories(&self, folder_id: i64) -> Result<Vec<Category>, Error> {
        CatalogStore::get_folder_categories(&self.db, folder_id)
    }

    fn clear_folder_categories(&self, folder_ids: &[i64]) -> Result<(), Error> {
        CatalogStore::clear_folder_categories(&self.db, folder_ids)
    }

    fn add_folder_categories(
        &self,
        folder_ids: &[i64],
        category_ids: &[i64],
    ) -> Result<(), Error> {
        CatalogStore::add_folder_categories(&self.db, folder_ids, category_ids)
    }

    fn replace_folder_categories(
        &self,
        folder_ids: &[i64],
        category_ids: &[i64],
    ) -> Result<(), Error> {
        CatalogStore::replace_folder_categories(&self.db, folder_ids, category_ids)
    }
}

/// Classifier answering from a fixed file-name table; unknown names get `[]`.
#[derive(Default)]
pub struct TableClassifier {
    answers: HashMap<String, Vec<String>>,
}

impl TableClassifier {
    pub fn answer(mut self, file_name: &str, categories: &[&str]) -> Self {
        self.answers.insert(
            file_name.to_string(),
            categories.iter().map(|c| c.to_string()).collect(),
        );
        self
    }
}

impl Classifier for TableClassifier {
    fn is_enabled(&self) -> bool {
        true
    }

    fn classify(&self, file_name: &str, allowed: &[String]) -> Result<Vec<String>, ClassifierError> {
        Ok(self
            .answers
            .get(file_name)
            .map(|cats| {
                cats.iter()
                    .filter(|c| allowed.iter().any(|a| a.eq_ignore_ascii_case(c)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Enabled classifier whose every call fails.
pub struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn is_enabled(&self) -> bool {
        true
    }

    fn classify(&self, _: &str, _: &[String]) -> Result<Vec<String>, ClassifierError> {
        Err(ClassifierError::Response("model unavailable".to_string()))
    }
}

/// Records the peak number of concurrent `classify` calls.
#[derive(Default)]
pub struct ConcurrencyGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl ConcurrencyGauge {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for ConcurrencyGauge {
    fn is_enabled(&self) -> bool {
        true
    }

    fn classify(&self, _: &str, _: &[String]) -> Result<Vec<String>, ClassifierError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(5));
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}
