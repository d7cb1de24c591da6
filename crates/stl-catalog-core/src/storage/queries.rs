use super::models::*;
use super::sqlite::Database;
use rusqlite::{params, params_from_iter, Connection, Result, Row};
use tracing::debug;

/// SQLite's default bound-parameter limit is 999; stay well under it.
const ID_CHUNK: usize = 500;
/// Two parameters per link row.
const LINK_CHUNK: usize = ID_CHUNK / 2;

/// The two category join tables share one shape.
#[derive(Debug, Clone, Copy)]
enum Link {
    File,
    Folder,
}

impl Link {
    fn table(self) -> &'static str {
        match self {
            Link::File => "file_category",
            Link::Folder => "folder_category",
        }
    }

    fn owner_column(self) -> &'static str {
        match self {
            Link::File => "file_id",
            Link::Folder => "folder_id",
        }
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn job_from_row(row: &Row<'_>) -> Result<ScanJob> {
    Ok(ScanJob {
        id: row.get(0)?,
        status: row.get(1)?,
        found: row.get(2)?,
        processed: row.get(3)?,
        progress: row.get(4)?,
        error: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn folder_from_row(row: &Row<'_>) -> Result<FolderRecord> {
    Ok(FolderRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
        parent_id: row.get(3)?,
    })
}

fn file_from_row(row: &Row<'_>) -> Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        file_name: row.get(2)?,
        file_type: row.get(3)?,
        size: row.get(4)?,
        modified_at: row.get(5)?,
        hash: row.get(6)?,
        folder_id: row.get(7)?,
    })
}

fn category_from_row(row: &Row<'_>) -> Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        deleted: row.get(2)?,
        created_at: row.get(3)?,
    })
}

const JOB_COLUMNS: &str =
    "id, status, found, processed, progress, error, created_at, updated_at";
const FOLDER_COLUMNS: &str = "id, name, path, parent_id";
const FILE_COLUMNS: &str =
    "id, path, file_name, file_type, size, modified_at, hash, folder_id";
const CATEGORY_COLUMNS: &str = "id, name, deleted, created_at";

fn clear_links(conn: &Connection, link: Link, owner_ids: &[i64]) -> Result<usize> {
    let mut removed = 0;
    for chunk in owner_ids.chunks(ID_CHUNK) {
        let sql = format!(
            "DELETE FROM {} WHERE {} IN ({})",
            link.table(),
            link.owner_column(),
            placeholders(chunk.len())
        );
        removed += conn.execute(&sql, params_from_iter(chunk.iter()))?;
    }
    Ok(removed)
}

/// Insert the owner × category cross product, chunked into multi-row
/// `VALUES` statements. Returns the number of links actually added.
fn add_links(
    conn: &Connection,
    link: Link,
    owner_ids: &[i64],
    category_ids: &[i64],
) -> Result<usize> {
    let pairs: Vec<(i64, i64)> = owner_ids
        .iter()
        .flat_map(|&owner| category_ids.iter().map(move |&category| (owner, category)))
        .collect();

    let mut added = 0;
    for chunk in pairs.chunks(LINK_CHUNK) {
        let values = vec!["(?, ?)"; chunk.len()].join(", ");
        let sql = format!(
            "INSERT OR IGNORE INTO {} ({}, category_id) VALUES {}",
            link.table(),
            link.owner_column(),
            values
        );
        let bound = chunk.iter().flat_map(|(owner, category)| [owner, category]);
        added += conn.execute(&sql, params_from_iter(bound))?;
    }
    Ok(added)
}

impl Database {
    // ── Scan Jobs ────────────────────────────────────────────────

    pub fn create_scan_job(&self) -> Result<i64> {
        let now = now();
        let conn = self.connection();
        conn.execute(
            "INSERT INTO scan_job (status, found, processed, progress, created_at, updated_at) \
             VALUES (?1, 0, 0, 0, ?2, ?2)",
            params![JobStatus::Running, now],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Returns the number of rows changed (0 when the job does not exist).
    pub fn update_scan_job(&self, job_id: i64, update: &JobUpdate) -> Result<usize> {
        self.connection().execute(
            "UPDATE scan_job SET status = ?1, found = ?2, processed = ?3, progress = ?4, \
             error = ?5, updated_at = ?6 WHERE id = ?7",
            params![
                update.status,
                update.found,
                update.processed,
                update.progress,
                update.error,
                now(),
                job_id
            ],
        )
    }

    pub fn get_scan_job(&self, job_id: i64) -> Result<Option<ScanJob>> {
        let sql = format!("SELECT {} FROM scan_job WHERE id = ?1", JOB_COLUMNS);
        match self
            .connection()
            .query_row(&sql, params![job_id], job_from_row)
        {
            Ok(job) => Ok(Some(job)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Newest first.
    pub fn list_scan_jobs(&self, offset: i64, limit: i64) -> Result<Vec<ScanJob>> {
        let sql = format!(
            "SELECT {} FROM scan_job ORDER BY id DESC LIMIT ?1 OFFSET ?2",
            JOB_COLUMNS
        );
        let conn = self.connection();
        let mut stmt = conn.prepare(&sql)?;
        let jobs = stmt
            .query_map(params![limit, offset], job_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(jobs)
    }

    // ── Folders ──────────────────────────────────────────────────

    pub fn get_folder(&self, folder_id: i64) -> Result<Option<FolderRecord>> {
        let sql = format!("SELECT {} FROM folder WHERE id = ?1", FOLDER_COLUMNS);
        match self
            .connection()
            .query_row(&sql, params![folder_id], folder_from_row)
        {
            Ok(folder) => Ok(Some(folder)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn get_folder_by_path(&self, path: &str) -> Result<Option<FolderRecord>> {
        let sql = format!("SELECT {} FROM folder WHERE path = ?1", FOLDER_COLUMNS);
        match self
            .connection()
            .query_row(&sql, params![path], folder_from_row)
        {
            Ok(folder) => Ok(Some(folder)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Insert a folder, or update name and parent of the row already holding `path`.
    pub fn create_folder(
        &self,
        name: &str,
        path: &str,
        parent_id: Option<i64>,
    ) -> Result<FolderRecord> {
        let now = now();
        let sql = format!(
            "INSERT INTO folder (name, path, parent_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4) \
             ON CONFLICT(path) DO UPDATE SET \
                 name = excluded.name, \
                 parent_id = excluded.parent_id, \
                 updated_at = excluded.updated_at \
             RETURNING {}",
            FOLDER_COLUMNS
        );
        self.connection()
            .query_row(&sql, params![name, path, parent_id, now], folder_from_row)
    }

    pub fn update_folder_parent(&self, folder_id: i64, parent_id: Option<i64>) -> Result<usize> {
        self.connection().execute(
            "UPDATE folder SET parent_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![parent_id, now(), folder_id],
        )
    }

    pub fn list_subfolders(&self, folder_id: i64) -> Result<Vec<FolderRecord>> {
        let sql = format!(
            "SELECT {} FROM folder WHERE parent_id = ?1 ORDER BY name",
            FOLDER_COLUMNS
        );
        let conn = self.connection();
        let mut stmt = conn.prepare(&sql)?;
        let folders = stmt
            .query_map(params![folder_id], folder_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(folders)
    }

    pub fn list_root_folders(&self) -> Result<Vec<FolderRecord>> {
        let sql = format!(
            "SELECT {} FROM folder WHERE parent_id IS NULL ORDER BY name",
            FOLDER_COLUMNS
        );
        let conn = self.connection();
        let mut stmt = conn.prepare(&sql)?;
        let folders = stmt
            .query_map([], folder_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(folders)
    }

    // ── Files ────────────────────────────────────────────────────

    pub fn upsert_file(&self, file: &NewFile) -> Result<FileRecord> {
        let now = now();
        let sql = format!(
            "INSERT INTO file \
             (path, file_name, file_type, size, modified_at, hash, folder_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8) \
             ON CONFLICT(path) DO UPDATE SET \
                 file_name = excluded.file_name, \
                 file_type = excluded.file_type, \
                 size = excluded.size, \
                 modified_at = excluded.modified_at, \
                 hash = excluded.hash, \
                 folder_id = excluded.folder_id, \
                 updated_at = excluded.updated_at \
             RETURNING {}",
            FILE_COLUMNS
        );
        self.connection().query_row(
            &sql,
            params![
                file.path,
                file.file_name,
                file.file_type,
                file.size,
                file.modified_at,
                file.hash,
                file.folder_id,
                now
            ],
            file_from_row,
        )
    }

    pub fn get_file(&self, file_id: i64) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {} FROM file WHERE id = ?1", FILE_COLUMNS);
        match self
            .connection()
            .query_row(&sql, params![file_id], file_from_row)
        {
            Ok(file) => Ok(Some(file)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn get_file_by_path(&self, path: &str) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {} FROM file WHERE path = ?1", FILE_COLUMNS);
        match self
            .connection()
            .query_row(&sql, params![path], file_from_row)
        {
            Ok(file) => Ok(Some(file)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Files directly inside `folder_id` (not in its subfolders).
    pub fn list_folder_files(&self, folder_id: i64) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {} FROM file WHERE folder_id = ?1 ORDER BY file_name",
            FILE_COLUMNS
        );
        let conn = self.connection();
        let mut stmt = conn.prepare(&sql)?;
        let files = stmt
            .query_map(params![folder_id], file_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(files)
    }

    // ── Categories ───────────────────────────────────────────────

    pub fn create_category(&self, name: &str) -> Result<Category> {
        let sql = format!(
            "INSERT INTO category (name, deleted, created_at) VALUES (?1, 0, ?2) RETURNING {}",
            CATEGORY_COLUMNS
        );
        self.connection()
            .query_row(&sql, params![name, now()], category_from_row)
    }

    /// Fetch the live category called `name`, creating it if absent.
    pub fn ensure_category(&self, name: &str) -> Result<Category> {
        let conn = self.connection();
        let select = format!(
            "SELECT {} FROM category WHERE name = ?1 AND deleted = 0",
            CATEGORY_COLUMNS
        );
        match conn.query_row(&select, params![name], category_from_row) {
            Ok(category) => Ok(category),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                let insert = format!(
                    "INSERT INTO category (name, deleted, created_at) VALUES (?1, 0, ?2) \
                     RETURNING {}",
                    CATEGORY_COLUMNS
                );
                let category = conn.query_row(&insert, params![name, now()], category_from_row)?;
                debug!(name, id = category.id, "Created category");
                Ok(category)
            }
            Err(e) => Err(e),
        }
    }

    pub fn get_category(&self, category_id: i64) -> Result<Option<Category>> {
        let sql = format!("SELECT {} FROM category WHERE id = ?1", CATEGORY_COLUMNS);
        match self
            .connection()
            .query_row(&sql, params![category_id], category_from_row)
        {
            Ok(category) => Ok(Some(category)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let sql = format!(
            "SELECT {} FROM category WHERE name = ?1 AND deleted = 0",
            CATEGORY_COLUMNS
        );
        match self
            .connection()
            .query_row(&sql, params![name], category_from_row)
        {
            Ok(category) => Ok(Some(category)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Live categories ordered by name.
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let sql = format!(
            "SELECT {} FROM category WHERE deleted = 0 ORDER BY name",
            CATEGORY_COLUMNS
        );
        let conn = self.connection();
        let mut stmt = conn.prepare(&sql)?;
        let categories = stmt
            .query_map([], category_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(categories)
    }

    pub fn list_all_categories(&self) -> Result<Vec<Category>> {
        let sql = format!("SELECT {} FROM category ORDER BY name, id", CATEGORY_COLUMNS);
        let conn = self.connection();
        let mut stmt = conn.prepare(&sql)?;
        let categories = stmt
            .query_map([], category_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(categories)
    }

    pub fn rename_category(&self, category_id: i64, name: &str) -> Result<usize> {
        self.connection().execute(
            "UPDATE category SET name = ?1 WHERE id = ?2",
            params![name, category_id],
        )
    }

    pub fn soft_delete_category(&self, category_id: i64) -> Result<usize> {
        self.connection().execute(
            "UPDATE category SET deleted = 1 WHERE id = ?1 AND deleted = 0",
            params![category_id],
        )
    }

    /// Fails with a constraint violation if a live category already uses the name.
    pub fn restore_category(&self, category_id: i64) -> Result<usize> {
        self.connection().execute(
            "UPDATE category SET deleted = 0 WHERE id = ?1 AND deleted = 1",
            params![category_id],
        )
    }

    // ── Category Associations ────────────────────────────────────

    pub fn get_file_categories(&self, file_id: i64) -> Result<Vec<Category>> {
        self.linked_categories(Link::File, file_id)
    }

    pub fn get_folder_categories(&self, folder_id: i64) -> Result<Vec<Category>> {
        self.linked_categories(Link::Folder, folder_id)
    }

    fn linked_categories(&self, link: Link, owner_id: i64) -> Result<Vec<Category>> {
        let sql = format!(
            "SELECT c.id, c.name, c.deleted, c.created_at \
             FROM category c JOIN {} l ON l.category_id = c.id \
             WHERE l.{} = ?1 AND c.deleted = 0 ORDER BY c.name",
            link.table(),
            link.owner_column()
        );
        let conn = self.connection();
        let mut stmt = conn.prepare(&sql)?;
        let categories = stmt
            .query_map(params![owner_id], category_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(categories)
    }

    pub fn clear_file_categories(&self, file_ids: &[i64]) -> Result<usize> {
        clear_links(&self.connection(), Link::File, file_ids)
    }

    pub fn add_file_categories(&self, file_ids: &[i64], category_ids: &[i64]) -> Result<usize> {
        add_links(&self.connection(), Link::File, file_ids, category_ids)
    }

    pub fn clear_folder_categories(&self, folder_ids: &[i64]) -> Result<usize> {
        clear_links(&self.connection(), Link::Folder, folder_ids)
    }

    pub fn add_folder_categories(
        &self,
        folder_ids: &[i64],
        category_ids: &[i64],
    ) -> Result<usize> {
        add_links(&self.connection(), Link::Folder, folder_ids, category_ids)
    }

    /// Clear-then-set the categories of every file in `file_ids`, in one transaction.
    pub fn replace_file_categories(&self, file_ids: &[i64], category_ids: &[i64]) -> Result<usize> {
        self.replace_links(Link::File, file_ids, category_ids)
    }

    /// Clear-then-set the categories of every folder in `folder_ids`, in one transaction.
    pub fn replace_folder_categories(
        &self,
        folder_ids: &[i64],
        category_ids: &[i64],
    ) -> Result<usize> {
        self.replace_links(Link::Folder, folder_ids, category_ids)
    }

    fn replace_links(&self, link: Link, owner_ids: &[i64], category_ids: &[i64]) -> Result<usize> {
        if owner_ids.is_empty() {
            return Ok(0);
        }
        let conn = self.connection();
        let tx = conn.unchecked_transaction()?;
        let removed = clear_links(&tx, link, owner_ids)?;
        let added = add_links(&tx, link, owner_ids, category_ids)?;
        tx.commit()?;
        debug!(
            table = link.table(),
            owners = owner_ids.len(),
            removed,
            added,
            "Replaced category links"
        );
        Ok(added)
    }
}
