pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod pipeline;
pub mod progress;
pub mod propagate;
pub mod scanner;
pub mod storage;

pub use classifier::{Classifier, DisabledClassifier, OpenAiClassifier, FALLBACK_CATEGORY};
pub use config::AppConfig;
pub use engine::{ScanEngine, ScanSummary};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
pub use propagate::{PropagationReport, PropagationScope};
pub use scanner::{CancelToken, FileDescriptor, FileType};
pub use storage::{CatalogStore, Database};
