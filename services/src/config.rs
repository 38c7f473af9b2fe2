use std::{
    collections::HashMap,
    fs,
    io,
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::de;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error loading settings from {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed settings in {}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No ListenBrainz token configured; set `listenbrainz_token` or LISTENBRAINZ_TOKEN")]
    MissingToken,

    #[error("ListenBrainz token validation failed")]
    InvalidToken,
}


/// Everything read from `settings.json`, built once at startup
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(deserialize_with = "de::optional_token")]
    pub listenbrainz_token: Option<Uuid>,

    /// Root of a listenbrainz compatible API; the official service when absent
    pub api_url: Option<String>,

    pub currentsong_file: PathBuf,

    #[serde(deserialize_with = "de::floored_secs")]
    pub min_play_time: Duration,

    pub retry: RetryPolicy,
    pub features: Features,
    pub filters: FilterSettings,

    pub cache_file: PathBuf,
    pub cache_dir: Option<PathBuf>,

    #[serde(deserialize_with = "de::floored_secs")]
    pub cache_sync_interval: Duration,

    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listenbrainz_token: None,
            api_url: None,
            currentsong_file: PathBuf::from("/var/local/www/currentsong.txt"),
            min_play_time: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            features: Features::default(),
            filters: FilterSettings::default(),
            cache_file: PathBuf::from("pending_listens.json"),
            cache_dir: None,
            cache_sync_interval: Duration::from_secs(60),
            logging: LoggingSettings::default(),
        }
    }
}

impl Settings {
    /// Reads and parses the settings file at `path`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read and
    /// [`ConfigError::Malformed`] if it is not valid settings json.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ConfigError::Malformed {
            path: path.to_owned(),
            source,
        })
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> { serde_json::from_str(raw) }

    /// Replaces the configured token, e.g. with one taken from the environment
    #[must_use]
    pub fn with_token(mut self, token: Option<Uuid>) -> Self {
        if token.is_some() {
            self.listenbrainz_token = token;
        }
        self
    }

    /// Replaces the configured API root
    #[must_use]
    pub fn with_api_url(mut self, url: Option<String>) -> Self {
        if url.is_some() {
            self.api_url = url;
        }
        self
    }

    pub fn token(&self) -> Result<Uuid, ConfigError> { self.listenbrainz_token.ok_or(ConfigError::MissingToken) }

    /// Location of the listen cache; relative `cache_file` values live under
    /// `cache_dir`, falling back to `default_dir`
    pub fn cache_path(&self, default_dir: &Path) -> PathBuf {
        if self.cache_file.is_absolute() {
            self.cache_file.clone()
        } else {
            self.cache_dir.as_deref().unwrap_or(default_dir).join(&self.cache_file)
        }
    }
}


#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub count: u32,
    #[serde(deserialize_with = "de::floored_secs")]
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            count: 3,
            delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Number of submission attempts; always at least one
    pub fn attempts(&self) -> u32 { self.count.max(1) }
}


#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Features {
    pub enable_listening_now: bool,
    pub enable_listen: bool,
    pub enable_cache: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            enable_listening_now: true,
            enable_listen: true,
            enable_cache: true,
        }
    }
}


#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Field name to substrings that mark a track as ignored
    pub ignore_patterns: HashMap<String, Vec<String>>,
    pub case_sensitive: bool,
}


#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub enable: bool,
    pub level: String,
    /// `{level}` and `{message}` are substituted
    pub format: String,
    pub timestamp: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enable: true,
            level: "info".to_owned(),
            format: "[{level}] {message}".to_owned(),
            timestamp: false,
        }
    }
}
