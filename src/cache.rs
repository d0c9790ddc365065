//! Reconciles remote file URIs against files already in the local DICOM
//! index, to decide whether a download can be skipped.

use crate::classify::DicomClassifier;
use crate::uri::{abbreviate, adjust_path_slashes};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Result of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheCheck {
    /// Number of remote URIs classified as DICOM
    pub candidates: usize,
    /// Indexed files matched by some candidate; may contain duplicates
    pub matched: Vec<PathBuf>,
}

impl CacheCheck {
    /// Every candidate accounted for. Zero candidates with zero matches
    /// counts as a hit.
    pub fn is_full_hit(&self) -> bool {
        self.matched.len() == self.candidates
    }
}

/// Compares abbreviated remote URIs with abbreviated indexed paths
pub struct CacheReconciler<'a> {
    classifier: &'a dyn DicomClassifier,
    splitter: &'a str,
}

impl<'a> CacheReconciler<'a> {
    pub fn new(classifier: &'a dyn DicomClassifier, splitter: &'a str) -> Self {
        Self {
            classifier,
            splitter,
        }
    }

    /// Match `remote_uris` against `indexed_files`.
    ///
    /// A candidate matches an indexed file when the candidate's text after
    /// the splitter is a substring of the indexed file's text after the
    /// splitter. Each (indexed file, candidate) pair that matches adds one
    /// entry, so short keys can over-match.
    pub fn check<S, P>(&self, remote_uris: &[S], indexed_files: &[P]) -> CacheCheck
    where
        S: AsRef<str>,
        P: AsRef<Path>,
    {
        let normalized: Vec<String> = remote_uris
            .iter()
            .map(|u| adjust_path_slashes(u.as_ref()))
            .collect();

        let candidates: Vec<&str> = normalized
            .iter()
            .filter(|u| self.classifier.is_dicom(u))
            .map(String::as_str)
            .collect();

        // Candidates without the splitter stay counted but can never match
        let keys: Vec<&str> = candidates
            .iter()
            .filter_map(|u| abbreviate(u, self.splitter))
            .collect();

        // Later entries overwrite earlier ones on identical abbreviations
        let mut index: BTreeMap<String, PathBuf> = BTreeMap::new();
        for file in indexed_files {
            let adjusted = adjust_path_slashes(&file.as_ref().to_string_lossy());
            if let Some(abbrev) = abbreviate(&adjusted, self.splitter) {
                index.insert(abbrev.to_string(), PathBuf::from(&adjusted));
            }
        }

        let mut matched = Vec::new();
        for (abbrev, full) in &index {
            for key in &keys {
                if abbrev.contains(key) {
                    matched.push(full.clone());
                }
            }
        }

        debug!(
            "Cache check: {} candidates, {} indexed, {} matched",
            candidates.len(),
            index.len(),
            matched.len()
        );

        CacheCheck {
            candidates: candidates.len(),
            matched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ExtensionClassifier;

    const SPLITTER: &str = "/experiments/";

    fn remote(name: &str) -> String {
        format!(
            "/data/projects/P1/subjects/S1/experiments/E1/scans/2/resources/DICOM/files/{}",
            name
        )
    }

    fn local(name: &str) -> PathBuf {
        PathBuf::from(format!(
            "/cache/data/projects/P1/subjects/S1/experiments/E1/scans/2/resources/DICOM/files/{}",
            name
        ))
    }

    fn check(uris: &[String], indexed: &[PathBuf]) -> CacheCheck {
        let classifier = ExtensionClassifier::default();
        CacheReconciler::new(&classifier, SPLITTER).check(uris, indexed)
    }

    #[test]
    fn no_dicom_candidates_is_vacuous_hit() {
        let uris = vec![remote("notes.txt"), remote("snapshot.png")];
        let result = check(&uris, &[local("a.dcm")]);

        assert_eq!(result.candidates, 0);
        assert!(result.matched.is_empty());
        assert!(result.is_full_hit());
    }

    #[test]
    fn all_candidates_indexed_is_hit() {
        let uris = vec![remote("a.dcm"), remote("b.dcm"), remote("readme.txt")];
        let indexed = vec![local("a.dcm"), local("b.dcm"), PathBuf::from("/elsewhere/c.dcm")];
        let result = check(&uris, &indexed);

        assert_eq!(result.candidates, 2);
        assert!(result.is_full_hit());
        assert!(result.matched.contains(&local("a.dcm")));
        assert!(result.matched.contains(&local("b.dcm")));
    }

    #[test]
    fn one_missing_candidate_is_miss() {
        let uris = vec![remote("a.dcm"), remote("b.dcm")];
        let result = check(&uris, &[local("a.dcm")]);

        assert_eq!(result.candidates, 2);
        assert_eq!(result.matched, vec![local("a.dcm")]);
        assert!(!result.is_full_hit());
    }

    #[test]
    fn windows_separators_are_normalized_on_both_sides() {
        let uris = vec![remote("a.dcm").replace('/', "\\")];
        let indexed = vec![PathBuf::from(
            r"C:\cache\data\projects\P1\subjects\S1\experiments\E1\scans\2\resources\DICOM\files\a.dcm",
        )];
        let result = check(&uris, &indexed);

        assert!(result.is_full_hit());
        assert_eq!(result.matched.len(), 1);
    }

    #[test]
    fn substring_keys_can_over_match() {
        // the key for a.dcm is a prefix of the key for a.dcm.old.dcm
        let uris = vec![remote("a.dcm")];
        let indexed = vec![local("a.dcm"), local("a.dcm.old.dcm")];
        let result = check(&uris, &indexed);

        assert_eq!(result.matched.len(), 2);
        assert!(!result.is_full_hit());
    }

    #[test]
    fn candidate_without_splitter_never_matches() {
        let uris = vec!["/data/projects/P1/resources/DICOM/files/a.dcm".to_string()];
        let result = check(&uris, &[local("a.dcm")]);

        assert_eq!(result.candidates, 1);
        assert!(result.matched.is_empty());
        assert!(!result.is_full_hit());
    }

    #[test]
    fn colliding_abbreviations_keep_last_indexed_path() {
        let uris = vec![remote("a.dcm")];
        let indexed = vec![
            PathBuf::from("/old/experiments/E1/scans/2/resources/DICOM/files/a.dcm"),
            PathBuf::from("/new/experiments/E1/scans/2/resources/DICOM/files/a.dcm"),
        ];
        let result = check(&uris, &indexed);

        assert_eq!(
            result.matched,
            vec![PathBuf::from("/new/experiments/E1/scans/2/resources/DICOM/files/a.dcm")]
        );
        assert!(result.is_full_hit());
    }
}
