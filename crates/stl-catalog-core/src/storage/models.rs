use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::scanner::FileType;

/// Lifecycle of a scan job: `Running` until exactly one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

impl ToSql for JobStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for JobStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

/// One crawl-and-classify run.
#[derive(Debug, Clone, Serialize)]
pub struct ScanJob {
    pub id: i64,
    pub status: JobStatus,
    pub found: i64,
    pub processed: i64,
    pub progress: i64,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Field set written by every job status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub found: i64,
    pub processed: i64,
    pub progress: i64,
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn running(found: usize, processed: usize, progress: u8) -> Self {
        Self {
            status: JobStatus::Running,
            found: found as i64,
            processed: processed as i64,
            progress: progress as i64,
            error: None,
        }
    }

    pub fn completed(found: usize, processed: usize) -> Self {
        Self {
            status: JobStatus::Completed,
            found: found as i64,
            processed: processed as i64,
            progress: 100,
            error: None,
        }
    }

    pub fn failed(found: usize, message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            found: found as i64,
            processed: 0,
            progress: 0,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderRecord {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub id: i64,
    pub path: String,
    pub file_name: String,
    pub file_type: FileType,
    pub size: i64,
    pub modified_at: i64,
    pub hash: Option<String>,
    pub folder_id: Option<i64>,
}

/// Row contents for a file upsert, keyed by `path`.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub path: String,
    pub file_name: String,
    pub file_type: FileType,
    pub size: i64,
    pub modified_at: i64,
    pub hash: Option<String>,
    pub folder_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub deleted: bool,
    pub created_at: String,
}
