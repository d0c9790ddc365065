use crate::config::XnatConfig;
use crate::remote::{RemoteError, RemoteRepository, RemoteResult};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

/// REST client for an XNAT host
#[derive(Debug, Clone)]
pub struct XnatClient {
    host: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(rename = "ResultSet")]
    result_set: ResultSet,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    #[serde(rename = "Result", default)]
    result: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    #[serde(rename = "URI")]
    uri: String,
}

impl XnatClient {
    pub fn new(host: impl Into<String>, timeout: Duration) -> RemoteResult<Self> {
        let host = host.into();
        Url::parse(&host).map_err(|e| RemoteError::Url(host.clone(), e.to_string()))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(config: &XnatConfig) -> RemoteResult<Self> {
        Self::new(config.host.clone(), Duration::from_secs(config.timeout_secs))
    }

    /// Resource paths are appended to the host, so a host with a context
    /// path (`https://host/xnat`) keeps it.
    fn url(&self, path: &str) -> RemoteResult<Url> {
        let path = crate::uri::adjust_path_slashes(path);
        let joined = if path.starts_with('/') {
            format!("{}{}", self.host, path)
        } else {
            format!("{}/{}", self.host, path)
        };
        Url::parse(&joined).map_err(|e| RemoteError::Url(joined.clone(), e.to_string()))
    }

    fn check(method: &'static str, url: &Url, response: &reqwest::Response) -> RemoteResult<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RemoteError::Status {
                method,
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl RemoteRepository for XnatClient {
    async fn delete(&self, path: &str) -> RemoteResult<()> {
        let url = self.url(path)?;
        info!("🗑️  DELETE {}", url);
        let response = self.http.delete(url.clone()).send().await?;
        Self::check("DELETE", &url, &response)
    }

    async fn download_archive(&self, container_uri: &str, dst: &Path) -> RemoteResult<()> {
        let url = self.url(container_uri)?;
        info!("⬇️  Downloading {} to {}", url, dst.display());
        let response = self
            .http
            .get(url.clone())
            .query(&[("format", "zip")])
            .send()
            .await?;
        Self::check("GET", &url, &response)?;

        let io_err = |source| RemoteError::Io {
            path: dst.to_path_buf(),
            source,
        };
        if let Some(parent) = dst.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        // Written beside the destination and renamed, so a failed transfer
        // never leaves a truncated archive at `dst`
        let partial = dst.with_extension("part");
        let mut file = tokio::fs::File::create(&partial).await.map_err(io_err)?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_err)?;
        drop(file);
        tokio::fs::rename(&partial, dst).await.map_err(io_err)?;

        debug!("Downloaded {} bytes from {}", written, url);
        Ok(())
    }

    async fn list_files(&self, container_uri: &str) -> RemoteResult<Vec<String>> {
        let url = self.url(container_uri)?;
        debug!("Listing files of {}", url);
        let response = self
            .http
            .get(url.clone())
            .query(&[("format", "json")])
            .send()
            .await?;
        Self::check("GET", &url, &response)?;

        let body: ListResponse = response.json().await.map_err(|e| RemoteError::Response {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(body.result_set.result.into_iter().map(|f| f.uri).collect())
    }
}
