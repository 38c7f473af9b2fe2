use std::{
    io,
    path::PathBuf,
};

use thiserror::Error;

use crate::config::ConfigError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to read now playing file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid song info: missing {0}")]
    Validation(&'static str),

    #[error(transparent)]
    Remote(#[from] listenbrainz::Error),

    #[error("Remote service unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Cache file {} is corrupt", path.display())]
    CacheCorruption {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Whether the failure came from talking to the remote service
    pub fn is_remote(&self) -> bool { matches!(self, Self::Remote(_) | Self::RemoteUnavailable(_)) }
}
