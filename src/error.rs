use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while converting a video's track log into dataset files.
///
/// Every variant is fatal: the driver aborts the run and leaves whatever was
/// already written on disk.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("unknown category label {0:?}")]
    UnknownCategory(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a closure that attaches `path` to an `std::io::Error`, for use with `map_err`.
    pub fn io(path: impl AsRef<Path>) -> impl FnOnce(std::io::Error) -> Error {
        let path = path.as_ref().to_path_buf();
        move |source| Error::Io { path, source }
    }

    /// A missing input path, reported as an I/O `NotFound` error.
    pub fn not_found(path: impl AsRef<Path>, message: &str) -> Error {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, message.to_string()),
        }
    }
}
