//! Runtime settings.
//!
//! Settings are layered with figment: built-in defaults, then an optional
//! TOML file, then `CORNERSTONE_*` environment variables. Site content such
//! as the admin passcode lives in the database, not here.

use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::analytics::{ChartOptions, Period};
use crate::error::{Error, Result};

const CONFIG_FILE_NAME: &str = "config.toml";

const DATA_DIR_NAME: &str = "cornerstone";

const DATABASE_FILE_NAME: &str = "site.db";

/// Inside the data directory.
const UPLOAD_DIR_NAME: &str = "uploads";

/// Everything the server and CLI read at startup.
///
/// `CORNERSTONE_SERVER__PORT=9000` overrides `[server] port` from the file,
/// which overrides the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database location.
    pub storage: StorageConfig,
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Upload configuration.
    pub uploads: UploadConfig,
    /// Admin session configuration.
    pub admin: AdminConfig,
    /// Analytics report configuration.
    pub analytics: AnalyticsConfig,
    /// Gallery sync configuration.
    pub gallery: GalleryConfig,
}

/// `[storage]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file; `site.db` in the data directory when unset.
    pub database_path: Option<PathBuf>,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Origins allowed by CORS. Empty allows any origin.
    pub allowed_origins: Vec<String>,
}

/// Upload configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory uploaded files are written to.
    /// Defaults to `~/.local/share/cornerstone/uploads`
    pub directory: Option<PathBuf>,
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: usize,
    /// URL path the upload directory is served under.
    pub public_path: String,
}

/// Admin session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// How long a login session lasts, in minutes.
    pub session_ttl_minutes: u32,
}

/// Analytics report configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Period used when a request does not name one.
    pub default_period: Period,
    /// Buckets returned when a request does not give a limit.
    pub default_buckets: usize,
    /// Number of top pages in a summary.
    pub top_pages: usize,
    /// Chart width in pixels.
    pub chart_width: u32,
    /// Chart height in pixels.
    pub chart_height: u32,
    /// Distinct page paths counted per day. Further new paths share one
    /// overflow counter.
    pub max_paths_per_day: usize,
}

/// Gallery sync configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    /// Album-sync endpoint. Sync is disabled when unset.
    pub sync_endpoint: Option<String>,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            allowed_origins: Vec::new(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            directory: None, // Resolved to the data directory at runtime
            max_upload_bytes: 10 * 1024 * 1024,
            public_path: "/uploads".to_string(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            session_ttl_minutes: 8 * 60,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            default_period: Period::Weekly,
            default_buckets: 12,
            top_pages: 10,
            chart_width: 800,
            chart_height: 300,
            max_paths_per_day: 500,
        }
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            sync_endpoint: None,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load from the default file location.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer fails to parse or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load using `config_path` instead of the default file. A missing file
    /// is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if a layer fails to parse or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let file = config_path.unwrap_or_else(Self::default_config_path);

        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(&file))
            .merge(Env::prefixed("CORNERSTONE_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// `<config dir>/cornerstone/config.toml`
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// `<local data dir>/cornerstone`
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Check ranges and formats that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] naming the first bad key.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(invalid("server.host must not be empty"));
        }

        if self.uploads.max_upload_bytes == 0 {
            return Err(invalid("uploads.max_upload_bytes must be greater than 0"));
        }

        let public_path = &self.uploads.public_path;
        if !public_path.starts_with('/') || public_path.len() < 2 || public_path.ends_with('/') {
            return Err(invalid(format!(
                "uploads.public_path must start with '/' and name a directory: {public_path}"
            )));
        }

        if self.admin.session_ttl_minutes == 0 {
            return Err(invalid("admin.session_ttl_minutes must be greater than 0"));
        }

        if self.analytics.default_buckets == 0 || self.analytics.top_pages == 0 {
            return Err(invalid(
                "analytics.default_buckets and analytics.top_pages must be greater than 0",
            ));
        }

        if self.analytics.chart_width == 0 || self.analytics.chart_height == 0 {
            return Err(invalid("analytics chart dimensions must be greater than 0"));
        }

        if self.analytics.max_paths_per_day == 0 {
            return Err(invalid("analytics.max_paths_per_day must be greater than 0"));
        }

        if let Some(endpoint) = &self.gallery.sync_endpoint {
            if reqwest::Url::parse(endpoint).is_err() {
                return Err(invalid(format!(
                    "gallery.sync_endpoint is not a valid URL: {endpoint}"
                )));
            }
        }

        if self.gallery.request_timeout_secs == 0 {
            return Err(invalid("gallery.request_timeout_secs must be greater than 0"));
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the upload directory, resolving defaults if not set.
    #[must_use]
    pub fn upload_dir(&self) -> PathBuf {
        self.uploads
            .directory
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(UPLOAD_DIR_NAME))
    }

    /// Get the admin session lifetime.
    #[must_use]
    pub fn session_ttl(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.admin.session_ttl_minutes))
    }

    /// Get the chart dimensions.
    #[must_use]
    pub fn chart_options(&self) -> ChartOptions {
        ChartOptions {
            width: self.analytics.chart_width,
            height: self.analytics.chart_height,
            ..ChartOptions::default()
        }
    }

    /// Get the gallery request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.gallery.request_timeout_secs)
    }

    /// Get the address the server binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}
