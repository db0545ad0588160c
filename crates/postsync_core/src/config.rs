//! Sync run configuration.
//!
//! # Responsibility
//! - Hold endpoint, image service, pagination and authorship settings.
//! - Load overrides from JSON and validate them before any run starts.
//!
//! # Invariants
//! - Every field has a default, so a partial JSON file is valid input.
//! - A validated config has a non-zero page limit, image size and seed range.

use crate::model::record::AuthorId;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://dummyjson.com/posts";
pub const DEFAULT_IMAGE_HOST: &str = "https://picsum.photos";
pub const DEFAULT_IMAGE_WIDTH: u32 = 1200;
pub const DEFAULT_IMAGE_HEIGHT: u32 = 800;
pub const DEFAULT_SEED_MAX: u32 = 10_000;
pub const DEFAULT_PAGE_LIMIT: u64 = 30;
pub const DEFAULT_AUTHOR_ID: AuthorId = 1;
pub const DEFAULT_MAX_REDIRECTS: usize = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Settings shared by import and cleanup runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote posts endpoint, without pagination parameters.
    pub endpoint: String,
    /// Placeholder image service base URL.
    pub image_host: String,
    pub image_width: u32,
    pub image_height: u32,
    /// Upper bound of the random cache-busting seed (lower bound is 1).
    pub seed_max: u32,
    pub page_limit: u64,
    /// Author assigned to created records and their media.
    pub author_id: AuthorId,
    pub max_redirects: usize,
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            image_host: DEFAULT_IMAGE_HOST.to_string(),
            image_width: DEFAULT_IMAGE_WIDTH,
            image_height: DEFAULT_IMAGE_HEIGHT,
            seed_max: DEFAULT_SEED_MAX,
            page_limit: DEFAULT_PAGE_LIMIT,
            author_id: DEFAULT_AUTHOR_ID,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl SyncConfig {
    /// Loads a config from a JSON file; absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Rejects settings no run could succeed with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_http_url("endpoint", &self.endpoint)?;
        parse_http_url("image_host", &self.image_host)?;
        if self.page_limit == 0 {
            return Err(ConfigError::Invalid("page_limit must be at least 1".into()));
        }
        if self.image_width == 0 || self.image_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "image size must be non-zero, got {}x{}",
                self.image_width, self.image_height
            )));
        }
        if self.seed_max == 0 {
            return Err(ConfigError::Invalid("seed_max must be at least 1".into()));
        }
        if self.author_id <= 0 {
            return Err(ConfigError::Invalid(format!(
                "author_id must be positive, got {}",
                self.author_id
            )));
        }
        Ok(())
    }

    /// Parsed remote posts endpoint.
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        parse_http_url("endpoint", &self.endpoint)
    }

    /// Parsed placeholder image host.
    pub fn image_host_url(&self) -> Result<Url, ConfigError> {
        parse_http_url("image_host", &self.image_host)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_http_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|err| ConfigError::Invalid(format!("{field} `{value}` is not a URL: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Invalid(format!(
            "{field} must use http or https, got `{other}`"
        ))),
    }
}

/// Configuration load/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, SyncConfig};
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        SyncConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "page_limit": 10, "author_id": 7 }}"#).unwrap();

        let config = SyncConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.page_limit, 10);
        assert_eq!(config.author_id, 7);
        assert_eq!(config.endpoint, super::DEFAULT_ENDPOINT);
        assert_eq!(config.image_width, 1200);
    }

    #[test]
    fn validate_rejects_zero_limit_and_non_http_endpoint() {
        let zero_limit = SyncConfig {
            page_limit: 0,
            ..SyncConfig::default()
        };
        assert!(matches!(
            zero_limit.validate(),
            Err(ConfigError::Invalid(message)) if message.contains("page_limit")
        ));

        let ftp = SyncConfig {
            endpoint: "ftp://example.com/posts".to_string(),
            ..SyncConfig::default()
        };
        assert!(matches!(ftp.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = SyncConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
