//! Runtime configuration: TOML file plus `LENS_*` environment overrides.
//!
//! ```toml
//! refresh_interval_secs = 30
//! log_level = "info"
//! log_dir = "/var/log/lens"
//! seed_file = "seeds/demo.json"
//!
//! [backend]
//! kind = "http"
//! base_url = "http://127.0.0.1:8080/api"
//! timeout_secs = 10
//! ```

use crate::backend::{BackendError, HttpBackend, LensBackend, LocalBackend};
use crate::logging::{default_log_level, normalize_level};
use crate::seed::{SeedCatalog, SeedError};
use crate::store::CollectionOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REFRESH_SECS: u64 = 30;

pub const ENV_BASE_URL: &str = "LENS_BASE_URL";
pub const ENV_DB_PATH: &str = "LENS_DB_PATH";
pub const ENV_REFRESH_SECS: &str = "LENS_REFRESH_SECS";
pub const ENV_LOG_LEVEL: &str = "LENS_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "LENS_LOG_DIR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value `{value}` for {name}")]
    InvalidEnv { name: &'static str, value: String },
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Seed(#[from] SeedError),
}

/// Where artifacts live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    Http {
        base_url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    Local {
        db_path: PathBuf,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Http {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_refresh_secs() -> u64 {
    DEFAULT_REFRESH_SECS
}

fn default_level() -> String {
    default_log_level().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LensConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    /// `0` disables background refresh.
    #[serde(default = "default_refresh_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_level")]
    pub log_level: String,
    /// Logging stays off when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
            log_level: default_level(),
            log_dir: None,
            seed_file: None,
        }
    }
}

impl LensConfig {
    /// Loads `path` when given (defaults otherwise), applies process
    /// environment overrides, then validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides_from(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `LENS_*` overrides read through `lookup`.
    ///
    /// `LENS_BASE_URL` forces the HTTP backend and `LENS_DB_PATH` forces the
    /// local one; when both are set the local store wins.
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(base_url) = read(ENV_BASE_URL) {
            let timeout_secs = match &self.backend {
                BackendConfig::Http { timeout_secs, .. } => *timeout_secs,
                BackendConfig::Local { .. } => DEFAULT_TIMEOUT_SECS,
            };
            self.backend = BackendConfig::Http {
                base_url: base_url.trim().to_string(),
                timeout_secs,
            };
        }
        if let Some(db_path) = read(ENV_DB_PATH) {
            self.backend = BackendConfig::Local {
                db_path: PathBuf::from(db_path.trim()),
            };
        }
        if let Some(value) = read(ENV_REFRESH_SECS) {
            self.refresh_interval_secs =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnv {
                        name: ENV_REFRESH_SECS,
                        value: value.clone(),
                    })?;
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            self.log_level = level.trim().to_string();
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir.trim()));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.backend {
            BackendConfig::Http {
                base_url,
                timeout_secs,
            } => {
                let trimmed = base_url.trim();
                if trimmed.is_empty() {
                    return Err(ConfigError::Invalid("backend.base_url is empty".to_string()));
                }
                let url = reqwest::Url::parse(trimmed).map_err(|err| {
                    ConfigError::Invalid(format!("backend.base_url `{trimmed}`: {err}"))
                })?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(ConfigError::Invalid(format!(
                        "backend.base_url must use http or https, got `{}`",
                        url.scheme()
                    )));
                }
                if *timeout_secs == 0 {
                    return Err(ConfigError::Invalid(
                        "backend.timeout_secs must be greater than zero".to_string(),
                    ));
                }
            }
            BackendConfig::Local { db_path } => {
                if db_path.as_os_str().is_empty() {
                    return Err(ConfigError::Invalid("backend.db_path is empty".to_string()));
                }
            }
        }
        normalize_level(&self.log_level)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    /// Background refresh interval, `None` when disabled.
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }

    pub fn collection_options(&self) -> CollectionOptions {
        match self.refresh_interval() {
            Some(interval) => CollectionOptions::default().with_refresh_interval(Some(interval)),
            None => CollectionOptions::manual(),
        }
    }

    /// Instantiates the configured backend.
    pub fn build_backend(&self) -> Result<Arc<dyn LensBackend>, ConfigError> {
        let backend: Arc<dyn LensBackend> = match &self.backend {
            BackendConfig::Http {
                base_url,
                timeout_secs,
            } => Arc::new(HttpBackend::new(
                base_url,
                Duration::from_secs(*timeout_secs),
            )?),
            BackendConfig::Local { db_path } => Arc::new(LocalBackend::open(db_path)?),
        };
        Ok(backend)
    }

    /// Loads `seed_file`, or an empty catalog when none is configured.
    pub fn load_seeds(&self) -> Result<SeedCatalog, ConfigError> {
        match &self.seed_file {
            Some(path) => Ok(SeedCatalog::from_path(path)?),
            None => Ok(SeedCatalog::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BackendConfig, ConfigError, LensConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config: LensConfig = toml::from_str("").unwrap();
        assert_eq!(config, LensConfig::default());
        assert_eq!(
            config.backend,
            BackendConfig::Http {
                base_url: DEFAULT_BASE_URL.to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            }
        );
        assert_eq!(config.refresh_interval(), Some(Duration::from_secs(30)));
        config.validate().unwrap();
    }

    #[test]
    fn parses_local_backend_table() {
        let config: LensConfig = toml::from_str(
            r#"
            refresh_interval_secs = 0

            [backend]
            kind = "local"
            db_path = "/tmp/lens.sqlite3"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Local {
                db_path: PathBuf::from("/tmp/lens.sqlite3")
            }
        );
        assert_eq!(config.refresh_interval(), None);
        assert!(!config.collection_options().background);
    }

    #[test]
    fn env_overrides_switch_backend_and_refresh() {
        let vars = env(&[
            ("LENS_BASE_URL", " https://lens.example.com/api "),
            ("LENS_REFRESH_SECS", "5"),
            ("LENS_LOG_LEVEL", "warn"),
        ]);
        let mut config = LensConfig::default();
        config
            .apply_env_overrides_from(|name| vars.get(name).cloned())
            .unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Http {
                base_url: "https://lens.example.com/api".to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            }
        );
        assert_eq!(config.refresh_interval_secs, 5);
        assert_eq!(config.log_level, "warn");

        let vars = env(&[("LENS_DB_PATH", "/data/lens.db"), ("LENS_BASE_URL", "http://x")]);
        config
            .apply_env_overrides_from(|name| vars.get(name).cloned())
            .unwrap();
        assert!(matches!(config.backend, BackendConfig::Local { .. }));
    }

    #[test]
    fn bad_refresh_env_is_reported() {
        let vars = env(&[("LENS_REFRESH_SECS", "soon")]);
        let mut config = LensConfig::default();
        assert!(matches!(
            config.apply_env_overrides_from(|name| vars.get(name).cloned()),
            Err(ConfigError::InvalidEnv { name: "LENS_REFRESH_SECS", .. })
        ));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let http = |base_url: &str, timeout_secs: u64| LensConfig {
            backend: BackendConfig::Http {
                base_url: base_url.to_string(),
                timeout_secs,
            },
            ..LensConfig::default()
        };
        assert!(http("", 5).validate().is_err());
        assert!(http("ftp://files.example.com", 5).validate().is_err());
        assert!(http("http://localhost:8080", 0).validate().is_err());
        assert!(http("http://localhost:8080", 5).validate().is_ok());

        let relative_logs = LensConfig {
            log_dir: Some(PathBuf::from("logs")),
            ..LensConfig::default()
        };
        assert!(relative_logs.validate().is_err());

        let noisy = LensConfig {
            log_level: "shout".to_string(),
            ..LensConfig::default()
        };
        assert!(noisy.validate().is_err());
    }
}
