use crate::selection::Loadable;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("IO error writing scene entry '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize scene entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Receives what the import plugins load
pub trait Scene: Send + Sync {
    fn add(&self, plugin: &str, loadable: &Loadable) -> Result<PathBuf, SceneError>;
}

#[derive(Debug, Serialize)]
struct SceneEntry<'a> {
    plugin: &'a str,
    name: &'a str,
    series_instance_uid: Option<&'a str>,
    files: &'a [PathBuf],
    loaded_at: DateTime<Utc>,
}

/// Records each loaded item as a JSON manifest in a directory
#[derive(Debug, Clone)]
pub struct ManifestScene {
    dir: PathBuf,
}

impl ManifestScene {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Manifest file for a loadable; reloading the same series replaces it
    pub fn manifest_path(&self, plugin: &str, loadable: &Loadable) -> PathBuf {
        let key = loadable
            .series_instance_uid
            .as_deref()
            .unwrap_or(&loadable.name);
        self.dir
            .join(format!("{}-{}.json", sanitize(plugin), sanitize(key)))
    }
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl Scene for ManifestScene {
    fn add(&self, plugin: &str, loadable: &Loadable) -> Result<PathBuf, SceneError> {
        let path = self.manifest_path(plugin, loadable);
        let io_err = |source| SceneError::Io {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let entry = SceneEntry {
            plugin,
            name: &loadable.name,
            series_instance_uid: loadable.series_instance_uid.as_deref(),
            files: &loadable.files,
            loaded_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&entry)?;
        std::fs::write(&path, json).map_err(io_err)?;

        info!("🧩 Added '{}' to scene: {}", loadable.name, path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_is_written_per_series() {
        let dir = tempfile::TempDir::new().unwrap();
        let scene = ManifestScene::new(dir.path().join("scene"));
        let loadable = Loadable::new(
            "AXIAL T1",
            vec![PathBuf::from("/c/a.dcm"), PathBuf::from("/c/b.dcm")],
        )
        .with_series("1.2.3.4");

        let path = scene.add("scalar volume", &loadable).unwrap();

        assert_eq!(path.file_name().unwrap(), "scalar_volume-1.2.3.4.json");
        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["name"], "AXIAL T1");
        assert_eq!(value["files"].as_array().unwrap().len(), 2);
        assert_eq!(value["series_instance_uid"], "1.2.3.4");
    }

    #[test]
    fn name_is_used_without_series() {
        let scene = ManifestScene::new("/scene");
        let loadable = Loadable::new("RT: body/outline", vec![]);
        assert_eq!(
            scene.manifest_path("rtstruct", &loadable),
            PathBuf::from("/scene/rtstruct-RT__body_outline.json")
        );
    }
}
