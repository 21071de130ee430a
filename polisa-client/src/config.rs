//! Configuration loading for the Polisa console client.
//!
//! Connection and auth settings are required. Cache, import, pagination and
//! logging sections fall back to the engine defaults when omitted.

use polisa_engine::import::DEFAULT_CHUNK_SIZE;
use polisa_engine::pipeline::DEFAULT_PAGE_SIZE;
use polisa_engine::{CacheConfig, ImportRunnerConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted when `--config` is not given.
pub const CONFIG_ENV_VAR: &str = "POLISA_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsoleConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub import: ImportSection,
    #[serde(default)]
    pub pagination: PaginationSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub bearer_token: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportSection {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,
    pub company_id_hint: Option<i64>,
}

impl Default for ImportSection {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_delay_ms: default_chunk_delay_ms(),
            company_id_hint: None,
        }
    }
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_delay_ms() -> u64 {
    100
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaginationSection {
    pub page_size: usize,
}

impl Default for PaginationSection {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "polisa_engine=info,polisa_client=info,warn".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or POLISA_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] polisa_core::ConfigError),
}

impl ConsoleConfig {
    /// Load from `--config <path>` or `POLISA_CONFIG`, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args(std::env::args().skip(1)).or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), polisa_core::ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(invalid("api_base_url", &self.api_base_url, "must not be empty"));
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(invalid(
                "api_base_url",
                &self.api_base_url,
                "must start with http:// or https://",
            ));
        }
        let has_token = self
            .auth
            .bearer_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        let has_key = self
            .auth
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        if !has_token && !has_key {
            return Err(polisa_core::ConfigError::MissingField {
                field: "auth.bearer_token or auth.api_key".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(invalid("request_timeout_ms", "0", "must be > 0"));
        }
        if self.cache.ttl_secs == 0 {
            return Err(invalid("cache.ttl_secs", "0", "must be > 0"));
        }
        if self.import.chunk_size == 0 {
            return Err(invalid("import.chunk_size", "0", "must be > 0"));
        }
        if self.pagination.page_size == 0 {
            return Err(invalid("pagination.page_size", "0", "must be > 0"));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(invalid("logging.filter", &self.logging.filter, "must not be empty"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new().with_ttl(Duration::from_secs(self.cache.ttl_secs))
    }

    pub fn import_config(&self) -> ImportRunnerConfig {
        ImportRunnerConfig::new()
            .with_chunk_size(self.import.chunk_size)
            .with_chunk_delay(Duration::from_millis(self.import.chunk_delay_ms))
            .with_company_hint(self.import.company_id_hint)
    }

    pub fn page_size(&self) -> usize {
        self.pagination.page_size
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> polisa_core::ConfigError {
    polisa_core::ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from)
}

/// Value following `--config` in `args`, if any.
pub fn config_path_from_args(args: impl IntoIterator<Item = String>) -> Option<PathBuf> {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
