//! Error types for the delete and download-import workflows

use crate::database::DatabaseError;
use crate::remote::RemoteError;
use crate::selection::PluginError;
use crate::staging::StagingError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Failures that end a workflow. Cancellation and "no loadable found" are
/// outcomes, not errors.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Failed to delete '{target}' from XNAT: {source}")]
    RemoteDeleteFailed {
        target: String,
        #[source]
        source: RemoteError,
    },

    #[error("Download of '{uri}' failed: {source}")]
    DownloadFailed {
        uri: String,
        #[source]
        source: RemoteError,
    },

    #[error("Downloaded archive not found at '{0}'")]
    StagingMissing(PathBuf),

    #[error("No DICOM database is set up; downloaded files are at '{0}'")]
    DatabaseUnavailable(PathBuf),

    #[error("DICOM database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Staging error: {0}")]
    Staging(#[from] StagingError),

    #[error("Import plugin error: {0}")]
    Plugin(#[from] PluginError),
}

impl WorkflowError {
    /// Errors the user can resolve by changing local setup and re-running
    pub fn needs_user_action(&self) -> bool {
        matches!(
            self,
            WorkflowError::DatabaseUnavailable(_) | WorkflowError::StagingMissing(_)
        )
    }
}
