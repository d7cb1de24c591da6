use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;

pub const DEFAULT_MAX_WORKERS: usize = 20;
pub const DEFAULT_PROGRESS_INTERVAL: usize = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub root_dir: String,
    #[serde(default = "default_supported_exts")]
    pub supported_exts: Vec<String>,
    /// Directory names pruned from the crawl in addition to `.`/`$` prefixed ones.
    #[serde(default = "default_excluded_dir_names")]
    pub excluded_dir_names: Vec<String>,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
    #[serde(default)]
    pub compute_hashes: bool,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Level applied to the catalog crates' log targets.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

fn default_supported_exts() -> Vec<String> {
    vec![".stl".to_string(), ".zip".to_string(), ".rar".to_string()]
}

fn default_excluded_dir_names() -> Vec<String> {
    vec!["stl-manager-backend".to_string()]
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

fn default_progress_interval() -> usize {
    DEFAULT_PROGRESS_INTERVAL
}

fn default_db_path() -> String {
    "stl_catalog.db".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "./logs/stl-catalog.log".to_string()
}

impl AppConfig {
    /// Config with defaults for everything except the scan root.
    pub fn for_root(root_dir: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            supported_exts: default_supported_exts(),
            excluded_dir_names: default_excluded_dir_names(),
            ignore_patterns: Vec::new(),
            max_workers: DEFAULT_MAX_WORKERS,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            compute_hashes: false,
            db_path: default_db_path(),
            openai_api_key: None,
            openai_model: default_openai_model(),
            log_level: default_log_level(),
            log_file: default_log_file(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_dir.trim().is_empty() {
            return Err(ConfigError::Message("root_dir is required".to_string()));
        }
        if self.supported_exts.is_empty() {
            return Err(ConfigError::Message(
                "supported_exts must list at least one extension".to_string(),
            ));
        }
        if self.max_workers == 0 {
            return Err(ConfigError::Message("max_workers must be > 0".to_string()));
        }
        if self.progress_interval == 0 {
            return Err(ConfigError::Message(
                "progress_interval must be > 0".to_string(),
            ));
        }
        if self.log_file.trim().is_empty() {
            return Err(ConfigError::Message("log_file must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Load `Config.*` (optional) overlaid with `STL_CATALOG_*` environment variables.
/// A bare `OPENAI_API_KEY` is honoured when no prefixed key is set.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("STL_CATALOG")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("supported_exts")
                .with_list_parse_key("excluded_dir_names")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    let mut config = builder.try_deserialize::<AppConfig>()?;
    if config.openai_api_key.is_none() {
        config.openai_api_key = std::env::var("OPENAI_API_KEY").ok();
    }
    config.validate()?;
    Ok(config)
}
