use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod filesystem;

pub use filesystem::FilesystemStaging;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("IO error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid staging path: {0}")]
    Path(String),

    #[error("Failed to read archive '{path}': {message}")]
    Archive { path: PathBuf, message: String },
}

impl StagingError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type StagingResult<T> = Result<T, StagingError>;

/// Local area where remote archives are downloaded and unpacked
pub trait StagingArea: Send + Sync + std::fmt::Debug {
    /// Where the archive for a remote container is downloaded to
    fn archive_path(&self, container_uri: &str) -> StagingResult<PathBuf>;

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// Unpack an archive and return the extracted files
    fn extract(&self, archive: &Path) -> StagingResult<Vec<PathBuf>>;

    /// Delete a staged archive
    fn remove(&self, archive: &Path) -> StagingResult<()> {
        std::fs::remove_file(archive).map_err(|e| StagingError::io(archive, e))
    }
}
