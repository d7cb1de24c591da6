pub mod models;
mod queries;
mod sqlite;

pub use models::{
    Category, FileRecord, FolderRecord, JobStatus, JobUpdate, NewFile, ScanJob,
};
pub use sqlite::Database;

use crate::error::Error;

/// Trim a user-supplied category name, rejecting empty ones.
pub fn normalize_category_name(name: &str) -> Result<String, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("category name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

/// Persistence operations the scan pipeline and the propagator rely on.
///
/// Each call is atomic on its own; the pipeline never needs a transaction
/// spanning calls because every write is an idempotent upsert or a
/// clear-and-set. Id slices serve as both the singular and the batched form.
pub trait CatalogStore: Send + Sync {
    fn create_scan_job(&self) -> Result<i64, Error>;
    fn update_scan_job(&self, job_id: i64, update: &JobUpdate) -> Result<(), Error>;
    fn get_scan_job(&self, job_id: i64) -> Result<Option<ScanJob>, Error>;

    fn get_folder(&self, folder_id: i64) -> Result<Option<FolderRecord>, Error>;
    fn get_folder_by_path(&self, path: &str) -> Result<Option<FolderRecord>, Error>;
    fn create_folder(
        &self,
        name: &str,
        path: &str,
        parent_id: Option<i64>,
    ) -> Result<FolderRecord, Error>;
    fn update_folder_parent(&self, folder_id: i64, parent_id: Option<i64>) -> Result<(), Error>;
    fn list_subfolders(&self, folder_id: i64) -> Result<Vec<FolderRecord>, Error>;

    fn upsert_file(&self, file: &NewFile) -> Result<FileRecord, Error>;
    fn get_file(&self, file_id: i64) -> Result<Option<FileRecord>, Error>;
    fn list_folder_files(&self, folder_id: i64) -> Result<Vec<FileRecord>, Error>;

    /// Live (not soft-deleted) categories.
    fn list_categories(&self) -> Result<Vec<Category>, Error>;
    fn ensure_category(&self, name: &str) -> Result<Category, Error>;

    fn get_file_categories(&self, file_id: i64) -> Result<Vec<Category>, Error>;
    fn clear_file_categories(&self, file_ids: &[i64]) -> Result<(), Error>;
    fn add_file_categories(&self, file_ids: &[i64], category_ids: &[i64]) -> Result<(), Error>;
    fn replace_file_categories(&self, file_ids: &[i64], category_ids: &[i64])
        -> Result<(), Error>;

    fn get_folder_categories(&self, folder_id: i64) -> Result<Vec<Category>, Error>;
    fn clear_folder_categories(&self, folder_ids: &[i64]) -> Result<(), Error>;
    fn add_folder_categories(&self, folder_ids: &[i64], category_ids: &[i64])
        -> Result<(), Error>;
    fn replace_folder_categories(
        &self,
        folder_ids: &[i64],
        category_ids: &[i64],
    ) -> Result<(), Error>;
}

impl CatalogStore for Database {
    fn create_scan_job(&self) -> Result<i64, Error> {
        Ok(Database::create_scan_job(self)?)
    }

    fn update_scan_job(&self, job_id: i64, update: &JobUpdate) -> Result<(), Error> {
        match Database::update_scan_job(self, job_id, update)? {
            0 => Err(Error::NotFound(format!("scan job {}", job_id))),
            _ => Ok(()),
        }
    }

    fn get_scan_job(&self, job_id: i64) -> Result<Option<ScanJob>, Error> {
        Ok(Database::get_scan_job(self, job_id)?)
    }

    fn get_folder(&self, folder_id: i64) -> Result<Option<FolderRecord>, Error> {
        Ok(Database::get_folder(self, folder_id)?)
    }

    fn get_folder_by_path(&self, path: &str) -> Result<Option<FolderRecord>, Error> {
        Ok(Database::get_folder_by_path(self, path)?)
    }

    fn create_folder(
        &self,
        name: &str,
        path: &str,
        parent_id: Option<i64>,
    ) -> Result<FolderRecord, Error> {
        Ok(Database::create_folder(self, name, path, parent_id)?)
    }

    fn update_folder_parent(&self, folder_id: i64, parent_id: Option<i64>) -> Result<(), Error> {
        match Database::update_folder_parent(self, folder_id, parent_id)? {
            0 => Err(Error::NotFound(format!("folder {}", folder_id))),
            _ => Ok(()),
        }
    }

    fn list_subfolders(&self, folder_id: i64) -> Result<Vec<FolderRecord>, Error> {
        Ok(Database::list_subfolders(self, folder_id)?)
    }

    fn upsert_file(&self, file: &NewFile) -> Result<FileRecord, Error> {
        Ok(Database::upsert_file(self, file)?)
    }

    fn get_file(&self, file_id: i64) -> Result<Option<FileRecord>, Error> {
        Ok(Database::get_file(self, file_id)?)
    }

    fn list_folder_files(&self, folder_id: i64) -> Result<Vec<FileRecord>, Error> {
        Ok(Database::list_folder_files(self, folder_id)?)
    }

    fn list_categories(&self) -> Result<Vec<Category>, Error> {
        Ok(Database::list_categories(self)?)
    }

    fn ensure_category(&self, name: &str) -> Result<Category, Error> {
        Ok(Database::ensure_category(self, name)?)
    }

    fn get_file_categories(&self, file_id: i64) -> Result<Vec<Category>, Error> {
        Ok(Database::get_file_categories(self, file_id)?)
    }

    fn clear_file_categories(&self, file_ids: &[i64]) -> Result<(), Error> {
        Database::clear_file_categories(self, file_ids)?;
        Ok(())
    }

    fn add_file_categories(&self, file_ids: &[i64], category_ids: &[i64]) -> Result<(), Error> {
        Database::add_file_categories(self, file_ids, category_ids)?;
        Ok(())
    }

    fn replace_file_categories(
        &self,
        file_ids: &[i64],
        category_ids: &[i64],
    ) -> Result<(), Error> {
        Database::replace_file_categories(self, file_ids, category_ids)?;
        Ok(())
    }

    fn get_folder_categories(&self, folder_id: i64) -> Result<Vec<Category>, Error> {
        Ok(Database::get_folder_categories(self, folder_id)?)
    }

    fn clear_folder_categories(&self, folder_ids: &[i64]) -> Result<(), Error> {
        Database::clear_folder_categories(self, folder_ids)?;
        Ok(())
    }

    fn add_folder_categories(
        &self,
        folder_ids: &[i64],
        category_ids: &[i64],
    ) -> Result<(), Error> {
        Database::add_folder_categories(self, folder_ids, category_ids)?;
        Ok(())
    }

    fn replace_folder_categories(
        &self,
        folder_ids: &[i64],
        category_ids: &[i64],
    ) -> Result<(), Error> {
        Database::replace_folder_categories(self, folder_ids, category_ids)?;
        Ok(())
    }
}
