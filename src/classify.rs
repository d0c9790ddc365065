use crate::uri::basename;

/// Decides whether a (remote or local) path names a DICOM file
pub trait DicomClassifier: Send + Sync {
    fn is_dicom(&self, path: &str) -> bool;
}

/// Classifies by file extension of the last path segment.
#[derive(Debug, Clone)]
pub struct ExtensionClassifier {
    extensions: Vec<String>,
}

impl ExtensionClassifier {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }
}

impl Default for ExtensionClassifier {
    fn default() -> Self {
        Self::new(["dcm", "ima", "dicom", "dic"])
    }
}

impl DicomClassifier for ExtensionClassifier {
    fn is_dicom(&self, path: &str) -> bool {
        let name = basename(path);
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            }
            _ => false,
        }
    }
}
