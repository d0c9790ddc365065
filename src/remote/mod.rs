use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod xnat;

pub use xnat::XnatClient;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote URL '{0}': {1}")]
    Url(String, String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {url} returned status {status}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
    },

    #[error("IO error writing '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected response from {url}: {message}")]
    Response { url: String, message: String },
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Operations the workflows need from the remote repository host
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    /// Delete a resource (file or folder) at `path`
    async fn delete(&self, path: &str) -> RemoteResult<()>;

    /// Download a container's files as one archive to `dst`
    async fn download_archive(&self, container_uri: &str, dst: &Path) -> RemoteResult<()>;

    /// URIs of the files inside a container
    async fn list_files(&self, container_uri: &str) -> RemoteResult<Vec<String>>;
}
