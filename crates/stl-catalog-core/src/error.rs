use std::path::PathBuf;
use thiserror::Error;

use crate::classifier::ClassifierError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Scan root is not a readable directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error("Scan cancelled")]
    Cancelled,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
