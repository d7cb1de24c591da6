mod openai;

pub use openai::{parse_category_response, OpenAiClassifier};

use thiserror::Error;
use tracing::warn;

/// Category every file falls back to when classification yields nothing.
pub const FALLBACK_CATEGORY: &str = "uncategorized";

/// Upper bound on the number of categories a classifier may return.
pub const MAX_CATEGORIES: usize = 3;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("classifier is disabled")]
    Disabled,

    #[error("classifier request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("classifier returned an unusable response: {0}")]
    Response(String),
}

/// Assigns category names to a file from its name alone.
///
/// Implementations return at most [`MAX_CATEGORIES`] lowercase names, each a
/// member of `allowed`. A disabled classifier returns an empty list without
/// making any external call.
pub trait Classifier: Send + Sync {
    fn is_enabled(&self) -> bool;

    fn classify(&self, file_name: &str, allowed: &[String]) -> Result<Vec<String>, ClassifierError>;
}

/// Classifier used when no model is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledClassifier;

impl Classifier for DisabledClassifier {
    fn is_enabled(&self) -> bool {
        false
    }

    fn classify(&self, _file_name: &str, _allowed: &[String]) -> Result<Vec<String>, ClassifierError> {
        Ok(Vec::new())
    }
}

/// Classify `file_name`, substituting [`FALLBACK_CATEGORY`] when the classifier
/// is disabled, fails, or returns nothing. Never returns an empty list.
pub fn classify_or_fallback(
    classifier: &dyn Classifier,
    file_name: &str,
    allowed: &[String],
) -> Vec<String> {
    if !classifier.is_enabled() {
        return vec![FALLBACK_CATEGORY.to_string()];
    }

    match classifier.classify(file_name, allowed) {
        Ok(names) if !names.is_empty() => names,
        Ok(_) => vec![FALLBACK_CATEGORY.to_string()],
        Err(e) => {
            warn!(file = file_name, "Classification failed: {}", e);
            vec![FALLBACK_CATEGORY.to_string()]
        }
    }
}
