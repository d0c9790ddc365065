//! Local DICOM index contract and the registration retry policy.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

pub mod redb_index;

pub use redb_index::RedbDicomDatabase;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The index exists but its schema was never created
    #[error("DICOM database is uninitialized")]
    Uninitialized,

    #[error("DICOM database storage error: {0}")]
    Storage(#[from] redb::Error),

    #[error("Failed to prepare DICOM database at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Patient / study / series / file index of local DICOM instances
pub trait DicomDatabase: Send + Sync {
    /// Every indexed file
    fn all_files(&self) -> Result<Vec<PathBuf>>;

    fn patients(&self) -> Result<Vec<String>>;

    fn studies_for_patient(&self, patient: &str) -> Result<Vec<String>>;

    fn series_for_study(&self, study: &str) -> Result<Vec<String>>;

    fn files_for_series(&self, series: &str) -> Result<Vec<PathBuf>>;

    /// Index a batch of files, returning how many were accepted.
    /// Fails with [`DatabaseError::Uninitialized`] before [`initialize`](Self::initialize).
    fn register_files(&self, files: &[PathBuf]) -> Result<usize>;

    /// Create the index schema. Idempotent.
    fn initialize(&self) -> Result<()>;

    /// Location of the backing store, for user-facing messages
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// Register `files`, initializing the database and retrying exactly once if
/// it reports itself uninitialized. A second failure is returned as is.
pub fn register_with_retry(db: &dyn DicomDatabase, files: &[PathBuf]) -> Result<usize> {
    match db.register_files(files) {
        Err(DatabaseError::Uninitialized) => {
            warn!("🗄️  DICOM database is uninitialized, initializing it and retrying");
            db.initialize()?;
            db.register_files(files)
        }
        other => other,
    }
}
