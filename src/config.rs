use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::domain::Selection;
use crate::error::MafError;
use crate::metrics::MetricsColumns;
use crate::transfer::{Backoff, RetryPolicy};

pub const DEFAULT_API_BASE_URL: &str = "https://api.gdc.cancer.gov";
pub const DEFAULT_OUTPUT: &str = "outfile.maf";
pub const DEFAULT_PAGE_SIZE: usize = 10_000;
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const LOCAL_CONFIG_FILE: &str = "gdc-maf-cat.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_attempts: Option<usize>,
    #[serde(default)]
    pub backoff: Option<Backoff>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub metrics_columns: Option<MetricsColumns>,
}

#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub api_base_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub workers: usize,
    pub page_size: usize,
    pub metrics_columns: MetricsColumns,
}

impl Default for ResolvedSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            workers: 1,
            page_size: DEFAULT_PAGE_SIZE,
            metrics_columns: MetricsColumns::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    #[default]
    Append,
    Truncate,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub selection: Selection,
    pub output: Utf8PathBuf,
    pub metrics_only: bool,
    pub write_mode: WriteMode,
    pub scratch_root: Utf8PathBuf,
    pub settings: ResolvedSettings,
}

impl RunConfig {
    pub fn new(selection: Selection) -> Self {
        Self {
            selection,
            output: Utf8PathBuf::from(DEFAULT_OUTPUT),
            metrics_only: false,
            write_mode: WriteMode::Append,
            scratch_root: Utf8PathBuf::from("."),
            settings: ResolvedSettings::default(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedSettings, MafError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(ResolvedSettings::default()),
            },
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| MafError::ConfigRead(config_path.clone()))?;
        tracing::debug!(path = %config_path.display(), "loaded settings file");
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<ResolvedSettings, MafError> {
        let settings: Settings =
            serde_json::from_str(content).map_err(|err| MafError::ConfigParse(err.to_string()))?;
        Self::resolve_settings(settings)
    }

    pub fn resolve_settings(settings: Settings) -> Result<ResolvedSettings, MafError> {
        let defaults = ResolvedSettings::default();

        let max_attempts = settings.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 || max_attempts > DEFAULT_MAX_ATTEMPTS {
            return Err(MafError::ConfigParse(format!(
                "max_attempts must be between 1 and {DEFAULT_MAX_ATTEMPTS}"
            )));
        }
        let workers = settings.workers.unwrap_or(defaults.workers);
        if workers == 0 {
            return Err(MafError::ConfigParse(
                "workers must be at least 1".to_string(),
            ));
        }
        let page_size = settings.page_size.unwrap_or(defaults.page_size);
        if page_size == 0 {
            return Err(MafError::ConfigParse(
                "page_size must be at least 1".to_string(),
            ));
        }

        Ok(ResolvedSettings {
            api_base_url: settings
                .api_base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            timeout: settings
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            retry: RetryPolicy {
                max_attempts,
                backoff: settings.backoff.unwrap_or(defaults.retry.backoff),
            },
            workers,
            page_size,
            metrics_columns: settings.metrics_columns.unwrap_or_default(),
        })
    }

    fn default_path() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        ProjectDirs::from("gov", "gdc", "gdc-maf-cat")
            .map(|dirs| dirs.config_dir().join("config.json"))
            .filter(|path| path.exists())
    }
}
