//! Client configuration: where the service lives and where archives land.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Base URL used when neither `API_URL` nor the config file sets one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// File name the converted archive is saved under.
pub const DEFAULT_ARCHIVE_NAME: &str = "converted-images.zip";

/// Environment variable that overrides the configured base URL.
pub const BASE_URL_ENV: &str = "API_URL";

/// Configuration for the transfer client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the conversion service, without a trailing slash.
    pub base_url: String,
    /// Directory where the downloaded archive is saved.
    pub download_dir: PathBuf,
    /// File name of the downloaded archive.
    pub archive_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            download_dir: PathBuf::from("."),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service base URL. A trailing `/` is dropped.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(&base_url.into());
        self
    }

    /// Sets the directory the archive is written to.
    #[must_use]
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Sets the archive file name.
    #[must_use]
    pub fn with_archive_name(mut self, name: impl Into<String>) -> Self {
        self.archive_name = name.into();
        self
    }

    /// Full path the archive is saved to.
    #[must_use]
    pub fn archive_path(&self) -> PathBuf {
        self.download_dir.join(&self.archive_name)
    }

    /// Joins an endpoint path such as `/upload` onto the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Returns the default config file location.
    #[must_use]
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("luna-convert")
            .join("config.toml")
    }

    /// Loads configuration: defaults, then the config file (if present),
    /// then the `API_URL` environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> crate::Result<Self> {
        let path = Self::config_path();
        let file = path.exists().then_some(path.as_path());
        Self::load_from(file, std::env::var(BASE_URL_ENV).ok())
    }

    /// Layers an optional config file and an optional base URL override on
    /// top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `file` cannot be read or parsed.
    pub fn load_from(file: Option<&Path>, base_url_override: Option<String>) -> crate::Result<Self> {
        let mut config = match file {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                let parsed: Self = toml::from_str(&contents)?;
                log::info!("Loaded config from {}", path.display());
                parsed
            }
            None => Self::default(),
        };

        if let Some(url) = base_url_override.filter(|u| !u.trim().is_empty()) {
            config.base_url = url;
        }
        config.base_url = normalize_base_url(&config.base_url);
        Ok(config)
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
