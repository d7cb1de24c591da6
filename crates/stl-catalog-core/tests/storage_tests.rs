use stl_catalog_core::storage::{Database, JobStatus, JobUpdate, NewFile};
use stl_catalog_core::{CatalogStore, Error, FileType};

fn new_file(path: &str, folder_id: Option<i64>) -> NewFile {
    NewFile {
        path: path.to_string(),
        file_name: path.rsplit('/').next().unwrap_or(path).to_string(),
        file_type: FileType::Stl,
        size: 42,
        modified_at: 1700000000,
        hash: None,
        folder_id,
    }
}

#[test]
fn test_open_in_memory() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.list_categories().unwrap().is_empty());
    assert!(db.list_scan_jobs(0, 10).unwrap().is_empty());
}

#[test]
fn test_schema_migration_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.db");
    let path = path.to_str().unwrap();

    {
        let db = Database::open(path).unwrap();
        db.create_category("miniature").unwrap();
    }
    let db = Database::open(path).unwrap();
    assert_eq!(db.list_categories().unwrap().len(), 1);

    let version: i64 = db
        .connection()
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, 1);
}

#[test]
fn test_scan_job_lifecycle() {
    let db = Database::open_in_memory().unwrap();
    let job_id = db.create_scan_job().unwrap();

    let job = db.get_scan_job(job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!((job.found, job.processed, job.progress), (0, 0, 0));
    assert!(job.error.is_none());

    db.update_scan_job(job_id, &JobUpdate::running(10, 4, 42)).unwrap();
    let job = db.get_scan_job(job_id).unwrap().unwrap();
    assert_eq!((job.found, job.processed, job.progress), (10, 4, 42));

    db.update_scan_job(job_id, &JobUpdate::failed(10, "disk on fire"))
        .unwrap();
    let job = db.get_scan_job(job_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("disk on fire"));
}

#[test]
fn test_update_missing_job_is_not_found() {
    let db = Database::open_in_memory().unwrap();
    let err = CatalogStore::update_scan_job(&db, 999, &JobUpdate::completed(0, 0)).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_list_scan_jobs_newest_first() {
    let db = Database::open_in_memory().unwrap();
    let first = db.create_scan_job().unwrap();
    let second = db.create_scan_job().unwrap();

    let jobs = db.list_scan_jobs(0, 10).unwrap();
    let ids: Vec<i64> = jobs.iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![second, first]);

    assert_eq!(db.list_scan_jobs(1, 10).unwrap().len(), 1);
}

#[test]
fn test_folder_upsert_keyed_by_path() {
    let db = Database::open_in_memory().unwrap();
    let parent = db.create_folder("models", "/lib/models", None).unwrap();
    let child = db
        .create_folder("sub", "/lib/models/sub", Some(parent.id))
        .unwrap();
    let again = db
        .create_folder("sub", "/lib/models/sub", Some(parent.id))
        .unwrap();
    assert_eq!(child.id, again.id);

    let found = db.get_folder_by_path("/lib/models/sub").unwrap().unwrap();
    assert_eq!(found.parent_id, Some(parent.id));

    let subs = db.list_subfolders(parent.id).unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(db.list_root_folders().unwrap().len(), 1);

    assert_eq!(db.update_folder_parent(child.id, None).unwrap(), 1);
    assert!(db.list_subfolders(parent.id).unwrap().is_empty());
}

#[test]
fn test_file_upsert_updates_in_place() {
    let db = Database::open_in_memory().unwrap();
    let folder = db.create_folder("models", "/lib/models", None).unwrap();

    let first = db.upsert_file(&new_file("/lib/models/a.stl", None)).unwrap();
    let mut changed = new_file("/lib/models/a.stl", Some(folder.id));
    changed.size = 99;
    let second = db.upsert_file(&changed).unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.size, 99);
    assert_eq!(second.folder_id, Some(folder.id));
    assert_eq!(db.list_folder_files(folder.id).unwrap().len(), 1);
    assert_eq!(
        db.get_file_by_path("/lib/models/a.stl").unwrap().unwrap().id,
        first.id
    );
}

#[test]
fn test_category_soft_delete_and_restore() {
    let db = Database::open_in_memory().unwrap();
    let mini = db.create_category("miniature").unwrap();
    let file = db.upsert_file(&new_file("/lib/orc.stl", None)).unwrap();
    db.replace_file_categories(&[file.id], &[mini.id]).unwrap();

    assert_eq!(db.soft_delete_category(mini.id).unwrap(), 1);
    assert_eq!(db.soft_delete_category(mini.id).unwrap(), 0);
    assert!(db.list_categories().unwrap().is_empty());
    assert_eq!(db.list_all_categories().unwrap().len(), 1);
    assert!(db.get_file_categories(file.id).unwrap().is_empty());
    assert!(db.get_category_by_name("miniature").unwrap().is_none());

    assert_eq!(db.restore_category(mini.id).unwrap(), 1);
    assert_eq!(db.get_file_categories(file.id).unwrap().len(), 1);
}

#[test]
fn test_live_category_names_are_unique() {
    let db = Database::open_in_memory().unwrap();
    let old = db.create_category("mount").unwrap();
    assert!(db.create_category("mount").is_err());

    db.soft_delete_category(old.id).unwrap();
    let replacement = db.create_category("mount").unwrap();
    assert_ne!(old.id, replacement.id);

    // Restoring would create a second live "mount".
    assert!(db.restore_category(old.id).is_err());
}

#[test]
fn test_ensure_category_returns_existing() {
    let db = Database::open_in_memory().unwrap();
    let a = db.ensure_category("uncategorized").unwrap();
    let b = db.ensure_category("uncategorized").unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(db.list_categories().unwrap().len(), 1);
}

#[test]
fn test_rename_category() {
    let db = Database::open_in_memory().unwrap();
    let cat = db.create_category("figurine").unwrap();
    assert_eq!(db.rename_category(cat.id, "statue").unwrap(), 1);
    assert_eq!(db.get_category(cat.id).unwrap().unwrap().name, "statue");
}

#[test]
fn test_replace_categories_is_clear_and_set() {
    let db = Database::open_in_memory().unwrap();
    let a = db.create_category("a").unwrap();
    let b = db.create_category("b").unwrap();
    let c = db.create_category("c").unwrap();
    let f1 = db.upsert_file(&new_file("/lib/1.stl", None)).unwrap();
    let f2 = db.upsert_file(&new_file("/lib/2.stl", None)).unwrap();

    db.replace_file_categories(&[f1.id, f2.id], &[a.id, b.id])
        .unwrap();
    assert_eq!(db.get_file_categories(f2.id).unwrap().len(), 2);

    let added = db.replace_file_categories(&[f1.id], &[c.id]).unwrap();
    assert_eq!(added, 1);
    let names: Vec<String> = db
        .get_file_categories(f1.id)
        .unwrap()
        .into_iter()
        .map(|cat| cat.name)
        .collect();
    assert_eq!(names, vec!["c"]);
    assert_eq!(db.get_file_categories(f2.id).unwrap().len(), 2);

    assert_eq!(db.replace_file_categories(&[], &[a.id]).unwrap(), 0);
}

#[test]
fn test_link_cross_product_spans_chunks() {
    let db = Database::open_in_memory().unwrap();
    let files: Vec<i64> = (0..30)
        .map(|i| db.upsert_file(&new_file(&format!("/lib/part_{}.stl", i), None)).unwrap().id)
        .collect();
    let categories: Vec<i64> = (0..20)
        .map(|i| db.create_category(&format!("cat_{}", i)).unwrap().id)
        .collect();

    assert_eq!(db.add_file_categories(&files, &categories).unwrap(), 600);
    assert_eq!(db.add_file_categories(&files, &categories).unwrap(), 0);
    assert_eq!(db.get_file_categories(files[29]).unwrap().len(), 20);

    let total: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM file_category", [], |row| row.get(0))
        .unwrap();
    assert_eq!(total, 600);
    assert_eq!(db.add_file_categories(&files, &[]).unwrap(), 0);
}

#[test]
fn test_folder_category_links() {
    let db = Database::open_in_memory().unwrap();
    let folder = db.create_folder("models", "/lib/models", None).unwrap();
    let cat = db.create_category("terrain").unwrap();

    db.add_folder_categories(&[folder.id], &[cat.id]).unwrap();
    db.add_folder_categories(&[folder.id], &[cat.id]).unwrap();
    assert_eq!(db.get_folder_categories(folder.id).unwrap().len(), 1);

    db.clear_folder_categories(&[folder.id]).unwrap();
    assert!(db.get_folder_categories(folder.id).unwrap().is_empty());
}

#[test]
fn test_truncate_all_keeps_categories() {
    let db = Database::open_in_memory().unwrap();
    db.create_category("keep").unwrap();
    db.create_scan_job().unwrap();
    db.upsert_file(&new_file("/lib/x.stl", None)).unwrap();

    db.truncate_all().unwrap();
    assert!(db.list_scan_jobs(0, 10).unwrap().is_empty());
    assert!(db.get_file_by_path("/lib/x.stl").unwrap().is_none());
    assert_eq!(db.list_categories().unwrap().len(), 1);
}
