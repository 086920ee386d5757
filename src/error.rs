use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("catalog root not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("not a directory or cannot be statted: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid selector '{0}'")]
    Selector(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("override folder '{0}' is not in the catalog")]
    OverrideFolderMissing(String),
}

impl GalleryError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = GalleryError> = std::result::Result<T, E>;
