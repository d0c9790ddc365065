//! Remote resource URIs and the path arithmetic shared by the delete and
//! cache workflows.

use std::fmt;

/// Segment that marks a URI as pointing at a single file
pub const FILES_SEGMENT: &str = "/files/";

/// A resource path on the XNAT host, e.g.
/// `/data/projects/P1/subjects/S1/experiments/E1/scans/1/resources/DICOM/files/a.dcm`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteUri(String);

impl RemoteUri {
    /// Wraps a URI, normalizing its path separators.
    pub fn new(uri: impl AsRef<str>) -> Self {
        Self(adjust_path_slashes(uri.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File URIs address one file; everything else is a container
    /// (experiment, scan, resource folder).
    pub fn is_file(&self) -> bool {
        self.0.contains(FILES_SEGMENT)
    }

    /// Parent path: everything before the last `/`.
    pub fn parent(&self) -> &str {
        dirname(&self.0)
    }

    /// Path handed to the remote delete call: the URI itself for a file,
    /// otherwise its parent.
    pub fn deletion_target(&self) -> &str {
        if self.is_file() {
            &self.0
        } else {
            self.parent()
        }
    }

    pub fn name(&self) -> &str {
        basename(&self.0)
    }
}

impl fmt::Display for RemoteUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RemoteUri {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RemoteUri {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Canonical separators: backslashes become forward slashes.
pub fn adjust_path_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

/// Text following the first occurrence of `splitter`, up to the next
/// occurrence if there is one. `None` when the splitter is absent.
pub fn abbreviate<'a>(path: &'a str, splitter: &str) -> Option<&'a str> {
    path.split(splitter).nth(1)
}

pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(i) => &path[..i],
        None => "",
    }
}

pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}
