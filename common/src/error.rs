use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unknown metric '{0}'")]
    UnknownMetric(String),
    #[error("Could not read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid descriptor {path:?}")]
    Descriptor {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Descriptor {0:?} lists no configurations")]
    EmptyConfigurations(PathBuf),
    #[error("Render failed: {0}")]
    Render(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
