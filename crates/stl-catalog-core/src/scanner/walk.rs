use glob::Pattern;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use thiserror::Error;
use tracing::{debug, error, trace, warn};
use walkdir::{DirEntry, WalkDir};

use super::FileType;
use crate::error::Error;
use crate::progress::ProgressReporter;

/// Directory name prefixes that are never descended into (hidden and
/// system-reserved folders such as `.git` or `$RECYCLE.BIN`).
pub const RESERVED_DIR_PREFIXES: &[char] = &['.', '$'];

const CRAWL_PROGRESS_INTERVAL: usize = 100;

/// A file discovered by the crawler, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub file_name: String,
    pub file_type: FileType,
    pub size: u64,
    /// Seconds since the unix epoch.
    pub modified_at: i64,
    pub hash: Option<String>,
    /// Immediate containing directory; `None` for files directly under the root.
    pub folder_path: Option<PathBuf>,
    pub folder_name: Option<String>,
}

/// Cooperative cancellation flag shared between the caller and the crawl.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A crawl that stopped early. `partial` holds everything found before the stop.
#[derive(Error, Debug)]
#[error("crawl aborted after {} files: {source}", partial.len())]
pub struct CrawlAborted {
    pub partial: Vec<FileDescriptor>,
    #[source]
    pub source: Error,
}

impl From<CrawlAborted> for Error {
    fn from(aborted: CrawlAborted) -> Self {
        aborted.source
    }
}

pub struct Crawler {
    root: PathBuf,
    allowed_exts: Vec<String>,
    excluded_dir_names: Vec<String>,
    ignore_patterns: Vec<Pattern>,
}

impl Crawler {
    /// `allowed_exts` entries may be written `.stl` or `stl`, any case.
    pub fn new(root: impl AsRef<Path>, allowed_exts: &[String]) -> Self {
        Self {
            root: clean_path(root.as_ref()),
            allowed_exts: allowed_exts
                .iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
            excluded_dir_names: Vec::new(),
            ignore_patterns: Vec::new(),
        }
    }

    pub fn with_excluded_dir_names(mut self, names: &[String]) -> Self {
        self.excluded_dir_names = names.to_vec();
        self
    }

    pub fn with_ignore_patterns(mut self, globs: &[String]) -> Self {
        self.ignore_patterns = globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the root and collect every file whose extension is allowed and
    /// maps to a [`FileType`]. Unreadable entries are logged and skipped.
    pub fn crawl(
        &self,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<FileDescriptor>, CrawlAborted> {
        if !self.root.is_dir() {
            return Err(CrawlAborted {
                partial: Vec::new(),
                source: Error::InvalidRoot(self.root.clone()),
            });
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !self.is_pruned(entry));

        for entry_result in walker {
            if cancel.is_cancelled() {
                warn!(found = files.len(), "Crawl cancelled");
                return Err(CrawlAborted {
                    partial: files,
                    source: Error::Cancelled,
                });
            }

            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(
                        path = %err.path().map(|p| p.display().to_string()).unwrap_or_default(),
                        "Error accessing path: {}",
                        err
                    );
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            if let Some(descriptor) = self.describe(&entry) {
                files.push(descriptor);
                if files.len() % CRAWL_PROGRESS_INTERVAL == 0 {
                    reporter.on_crawl_progress(files.len(), &entry.path().to_string_lossy());
                }
            }
        }

        debug!(root = %self.root.display(), found = files.len(), "Crawl finished");
        Ok(files)
    }

    fn is_pruned(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return false;
        }

        if self
            .ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(entry.path()))
        {
            return true;
        }

        if !entry.file_type().is_dir() {
            return false;
        }

        let name = entry.file_name().to_string_lossy();
        name.starts_with(RESERVED_DIR_PREFIXES)
            || self.excluded_dir_names.iter().any(|excluded| *excluded == name)
    }

    fn describe(&self, entry: &DirEntry) -> Option<FileDescriptor> {
        let path = entry.path();
        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        if !self.allowed_exts.iter().any(|allowed| *allowed == ext) {
            return None;
        }
        let file_type = FileType::from_extension(&ext)?;

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(path = %path.display(), "Error reading metadata: {}", err);
                return None;
            }
        };

        let modified_at = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let (folder_path, folder_name) = match parent_folder(path, &self.root) {
            Some((folder_path, folder_name)) => (Some(folder_path), Some(folder_name)),
            None => (None, None),
        };

        trace!(path = %path.display(), file_type = %file_type, size = metadata.len(), "Found file");

        Some(FileDescriptor {
            path: path.to_path_buf(),
            file_name: entry.file_name().to_string_lossy().into_owned(),
            file_type,
            size: metadata.len(),
            modified_at,
            hash: None,
            folder_path,
            folder_name,
        })
    }
}

/// Immediate containing directory of `path` and its name, or `None` when the
/// directory is `root` itself.
pub fn parent_folder(path: &Path, root: &Path) -> Option<(PathBuf, String)> {
    let parent = path.parent()?;
    if parent.as_os_str().is_empty() || parent == clean_path(root) {
        return None;
    }
    let name = parent.file_name()?.to_string_lossy().into_owned();
    Some((parent.to_path_buf(), name))
}

/// Lexically normalize a path: drops `.` components and trailing separators.
pub(crate) fn clean_path(path: &Path) -> PathBuf {
    path.components().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentReporter;
    use std::fs;
    use tempfile::tempdir;

    fn exts() -> Vec<String> {
        vec![".stl".to_string(), ".zip".to_string(), ".rar".to_string()]
    }

    fn names(files: &[FileDescriptor]) -> Vec<String> {
        let mut names: Vec<String> = files.iter().map(|f| f.file_name.clone()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_crawl_filters_by_extension_case_insensitively() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("benchy.STL"), "solid").unwrap();
        fs::write(tmp.path().join("pack.zip"), "PK").unwrap();
        fs::write(tmp.path().join("notes.txt"), "hello").unwrap();

        let crawler = Crawler::new(tmp.path(), &exts());
        let files = crawler.crawl(&CancelToken::new(), &SilentReporter).unwrap();

        assert_eq!(names(&files), vec!["benchy.STL", "pack.zip"]);
        let benchy = files.iter().find(|f| f.file_name == "benchy.STL").unwrap();
        assert_eq!(benchy.file_type, FileType::Stl);
        assert_eq!(benchy.size, 5);
        assert!(benchy.folder_path.is_none());
        assert!(benchy.folder_name.is_none());
        assert!(benchy.hash.is_none());
    }

    #[test]
    fn test_allowed_extension_without_type_is_omitted() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("part.obj"), "v 0 0 0").unwrap();
        fs::write(tmp.path().join("part.stl"), "solid").unwrap();

        let allowed = vec!["obj".to_string(), "stl".to_string()];
        let files = Crawler::new(tmp.path(), &allowed)
            .crawl(&CancelToken::new(), &SilentReporter)
            .unwrap();

        assert_eq!(names(&files), vec!["part.stl"]);
    }

    #[test]
    fn test_reserved_and_excluded_directories_are_pruned() {
        let tmp = tempdir().unwrap();
        for dir in [".git", "$RECYCLE.BIN", "stl-manager-backend", "models/.cache"] {
            let path = tmp.path().join(dir);
            fs::create_dir_all(&path).unwrap();
            fs::write(path.join("hidden.stl"), "solid").unwrap();
        }
        fs::write(tmp.path().join("models").join("visible.stl"), "solid").unwrap();

        let files = Crawler::new(tmp.path(), &exts())
            .with_excluded_dir_names(&["stl-manager-backend".to_string()])
            .crawl(&CancelToken::new(), &SilentReporter)
            .unwrap();

        assert_eq!(names(&files), vec!["visible.stl"]);
    }

    #[test]
    fn test_ignore_patterns_skip_matching_paths() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("drafts")).unwrap();
        fs::write(tmp.path().join("drafts").join("wip.stl"), "solid").unwrap();
        fs::write(tmp.path().join("final.stl"), "solid").unwrap();

        let files = Crawler::new(tmp.path(), &exts())
            .with_ignore_patterns(&["**/drafts".to_string()])
            .crawl(&CancelToken::new(), &SilentReporter)
            .unwrap();

        assert_eq!(names(&files), vec!["final.stl"]);
    }

    #[test]
    fn test_parent_folder_is_immediate_directory() {
        let tmp = tempdir().unwrap();
        let sub = tmp.path().join("models").join("sub");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("c.stl"), "solid").unwrap();

        let files = Crawler::new(tmp.path(), &exts())
            .crawl(&CancelToken::new(), &SilentReporter)
            .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].folder_path.as_deref(), Some(sub.as_path()));
        assert_eq!(files[0].folder_name.as_deref(), Some("sub"));
    }

    #[test]
    fn test_parent_folder_of_root_level_file_is_none() {
        let root = Path::new("/library/prints/");
        assert!(parent_folder(Path::new("/library/prints/a.stl"), root).is_none());
        let (path, name) =
            parent_folder(Path::new("/library/prints/minis/orc.stl"), root).unwrap();
        assert_eq!(path, PathBuf::from("/library/prints/minis"));
        assert_eq!(name, "minis");
    }

    #[test]
    fn test_cancelled_crawl_returns_partial_and_error() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.stl"), "solid").unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let aborted = Crawler::new(tmp.path(), &exts())
            .crawl(&cancel, &SilentReporter)
            .unwrap_err();

        assert!(aborted.partial.is_empty());
        assert!(matches!(aborted.source, Error::Cancelled));
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let tmp = tempdir().unwrap();
        let missing = tmp.path().join("nope");
        let aborted = Crawler::new(&missing, &exts())
            .crawl(&CancelToken::new(), &SilentReporter)
            .unwrap_err();
        assert!(matches!(aborted.source, Error::InvalidRoot(_)));
    }
}
