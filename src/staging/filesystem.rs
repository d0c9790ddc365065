use crate::staging::{StagingArea, StagingError, StagingResult};
use std::fs;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Extension of downloaded container archives
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Filesystem-based staging area
///
/// Archives are stored under the root at the remote path of their container,
/// so local files keep the remote `/experiments/...` layout that cache
/// reconciliation compares against.
#[derive(Debug, Clone)]
pub struct FilesystemStaging {
    root_path: PathBuf,
}

impl FilesystemStaging {
    /// Create a staging area rooted at `root_path`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(root_path: P) -> StagingResult<Self> {
        let root_path = root_path.as_ref().to_path_buf();

        if !root_path.exists() {
            fs::create_dir_all(&root_path).map_err(|e| StagingError::io(&root_path, e))?;
        }

        Ok(Self { root_path })
    }

    pub fn root(&self) -> &Path {
        &self.root_path
    }

    /// Directory an archive is extracted into: the archive path minus its extension
    pub fn extraction_dir(archive: &Path) -> StagingResult<PathBuf> {
        match (archive.parent(), archive.file_stem()) {
            (Some(parent), Some(stem)) => Ok(parent.join(stem)),
            _ => Err(StagingError::Path(format!(
                "archive path '{}' has no file name",
                archive.display()
            ))),
        }
    }
}

impl StagingArea for FilesystemStaging {
    fn archive_path(&self, container_uri: &str) -> StagingResult<PathBuf> {
        let relative = Path::new(container_uri.trim_start_matches(|c: char| c == '/' || c == '\\'));
        for component in relative.components() {
            if !matches!(component, Component::Normal(_)) {
                return Err(StagingError::Path(format!(
                    "container URI '{}' must be a plain relative path",
                    container_uri
                )));
            }
        }
        if relative.as_os_str().is_empty() {
            return Err(StagingError::Path("container URI is empty".to_string()));
        }

        let mut path = self.root_path.join(relative).into_os_string();
        path.push(".");
        path.push(ARCHIVE_EXTENSION);
        Ok(PathBuf::from(path))
    }

    fn extract(&self, archive: &Path) -> StagingResult<Vec<PathBuf>> {
        let stem_dir = Self::extraction_dir(archive)?;
        fs::create_dir_all(&stem_dir).map_err(|e| StagingError::io(&stem_dir, e))?;

        let file = fs::File::open(archive).map_err(|e| StagingError::io(archive, e))?;
        let mut zip = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| StagingError::Archive {
            path: archive.to_path_buf(),
            message: format!("zip open error: {}", e),
        })?;

        let mut extracted = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).map_err(|e| StagingError::Archive {
                path: archive.to_path_buf(),
                message: format!("zip idx error: {}", e),
            })?;
            if entry.is_dir() {
                continue;
            }
            let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
                warn!("Skipping unsafe zip entry '{}' in {}", entry.name(), archive.display());
                continue;
            };

            let outpath = self.entry_base(&stem_dir, &relative).join(&relative);
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent).map_err(|e| StagingError::io(parent, e))?;
            }
            let mut outfile =
                fs::File::create(&outpath).map_err(|e| StagingError::io(&outpath, e))?;
            std::io::copy(&mut entry, &mut outfile).map_err(|e| StagingError::io(&outpath, e))?;

            debug!("Extracted {}", outpath.display());
            extracted.push(outpath);
        }

        info!(
            "📦 Extracted {} files from {} into {}",
            extracted.len(),
            archive.display(),
            stem_dir.display()
        );
        Ok(extracted)
    }
}

impl FilesystemStaging {
    /// Directory an entry's relative path is joined onto.
    ///
    /// XNAT roots its zips at the experiment label (`E1/scans/1/...`), so when
    /// the entry's first component also appears in the archive's own path the
    /// entry lands at that point and the local path repeats the remote one
    /// (`.../experiments/E1/scans/1/.../IM1.dcm`). Other entries keep their
    /// relative path under the extraction directory.
    fn entry_base(&self, stem_dir: &Path, relative: &Path) -> PathBuf {
        let mut parts = relative.components();
        let (Some(Component::Normal(first)), Some(_)) = (parts.next(), parts.next()) else {
            return stem_dir.to_path_buf();
        };
        let Ok(inside_root) = stem_dir.strip_prefix(&self.root_path) else {
            return stem_dir.to_path_buf();
        };

        let components: Vec<Component> = inside_root.components().collect();
        match components.iter().rposition(|c| *c == Component::Normal(first)) {
            Some(pos) => components[..pos]
                .iter()
                .fold(self.root_path.clone(), |acc, c| acc.join(c)),
            None => stem_dir.to_path_buf(),
        }
    }
}
