//! Picks the best-supported grouping of downloaded files and loads it.

use crate::database::DicomDatabase;
use crate::error::WorkflowError;
use crate::uri::{adjust_path_slashes, basename};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Plugin '{plugin}' failed to examine files: {message}")]
    Examine { plugin: String, message: String },

    #[error("Plugin '{plugin}' failed to load '{loadable}': {message}")]
    Load {
        plugin: String,
        loadable: String,
        message: String,
    },
}

/// A grouping of local files one plugin can import as a single object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Loadable {
    pub name: String,
    pub files: Vec<PathBuf>,
    pub series_instance_uid: Option<String>,
}

impl Loadable {
    pub fn new(name: impl Into<String>, files: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            files,
            series_instance_uid: None,
        }
    }

    pub fn with_series(mut self, series: impl Into<String>) -> Self {
        self.series_instance_uid = Some(series.into());
        self
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// An importer that can claim files and load what it claimed
pub trait ImportPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Propose loadables for the given groups of files
    fn examine(&self, file_groups: &[Vec<PathBuf>]) -> Result<Vec<Loadable>, PluginError>;

    fn load(&self, loadable: &Loadable) -> Result<(), PluginError>;
}

/// What the import step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Loaded { plugin: String, loadable: Loadable },
    NoLoadable,
}

impl ImportOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, ImportOutcome::Loaded { .. })
    }
}

/// Index of the loadable with the strictly greatest file count; the first
/// one wins ties. `None` only for an empty slice.
pub fn select_best(loadables: &[Loadable]) -> Option<usize> {
    if loadables.is_empty() {
        return None;
    }
    let mut best = 0;
    let mut highest = 0;
    for (i, loadable) in loadables.iter().enumerate() {
        if loadable.file_count() > highest {
            highest = loadable.file_count();
            best = i;
        }
    }
    Some(best)
}

/// Indexed files whose basename matches one of `downloaded`, walking the
/// database by patient, study and series so the result follows the series
/// membership the database inferred.
pub fn matched_database_files(
    db: &dyn DicomDatabase,
    downloaded: &[PathBuf],
) -> Result<Vec<PathBuf>, WorkflowError> {
    let mut by_name: HashMap<String, &Path> = HashMap::new();
    for file in downloaded {
        let adjusted = adjust_path_slashes(&file.to_string_lossy());
        by_name.insert(basename(&adjusted).to_string(), file.as_path());
    }

    let mut matched = Vec::new();
    for patient in db.patients()? {
        for study in db.studies_for_patient(&patient)? {
            for series in db.series_for_study(&study)? {
                for file in db.files_for_series(&series)? {
                    let adjusted = adjust_path_slashes(&file.to_string_lossy());
                    if by_name.contains_key(basename(&adjusted)) {
                        matched.push(file);
                    }
                }
            }
        }
    }

    debug!(
        "{} of {} downloaded files found in the database",
        matched.len(),
        downloaded.len()
    );
    Ok(matched)
}

/// Runs plugins in priority order over the matched file set
pub struct ImportSelector<'a> {
    plugins: &'a [Arc<dyn ImportPlugin>],
}

impl<'a> ImportSelector<'a> {
    pub fn new(plugins: &'a [Arc<dyn ImportPlugin>]) -> Self {
        Self { plugins }
    }

    /// The first plugin returning any loadables wins; later plugins are not
    /// asked.
    pub fn examine(
        &self,
        files: &[PathBuf],
    ) -> Result<Option<(&'a Arc<dyn ImportPlugin>, Vec<Loadable>)>, PluginError> {
        let groups = vec![files.to_vec()];
        for plugin in self.plugins {
            let loadables = plugin.examine(&groups)?;
            debug!(
                "Plugin '{}' proposed {} loadables",
                plugin.name(),
                loadables.len()
            );
            if !loadables.is_empty() {
                return Ok(Some((plugin, loadables)));
            }
        }
        Ok(None)
    }

    /// Examine `files`, then load the largest loadable of the winning plugin.
    pub fn import(&self, files: &[PathBuf]) -> Result<ImportOutcome, PluginError> {
        let Some((plugin, mut loadables)) = self.examine(files)? else {
            warn!("No loadables were found for {} files", files.len());
            return Ok(ImportOutcome::NoLoadable);
        };

        let index = select_best(&loadables).unwrap_or(0);
        let chosen = loadables.swap_remove(index);
        info!(
            "📥 Loading '{}' ({} files) with plugin '{}'",
            chosen.name,
            chosen.file_count(),
            plugin.name()
        );
        plugin.load(&chosen)?;

        Ok(ImportOutcome::Loaded {
            plugin: plugin.name().to_string(),
            loadable: chosen,
        })
    }
}

/// Load a set of downloaded (or cached) files from the database.
pub fn load_from_database(
    db: &dyn DicomDatabase,
    plugins: &[Arc<dyn ImportPlugin>],
    downloaded: &[PathBuf],
) -> Result<ImportOutcome, WorkflowError> {
    let matched = matched_database_files(db, downloaded)?;
    Ok(ImportSelector::new(plugins).import(&matched)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn loadable(name: &str, count: usize) -> Loadable {
        let files = (0..count)
            .map(|i| PathBuf::from(format!("/cache/{}/{}.dcm", name, i)))
            .collect();
        Loadable::new(name, files)
    }

    /// Returns a fixed list from `examine` and records every call
    struct FixedPlugin {
        name: String,
        proposals: Vec<Loadable>,
        examined: Mutex<usize>,
        loaded: Mutex<Vec<Loadable>>,
    }

    impl FixedPlugin {
        fn new(name: &str, proposals: Vec<Loadable>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                proposals,
                examined: Mutex::new(0),
                loaded: Mutex::new(Vec::new()),
            })
        }
    }

    impl ImportPlugin for FixedPlugin {
        fn name(&self) -> &str {
            &self.name
        }

        fn examine(&self, _file_groups: &[Vec<PathBuf>]) -> Result<Vec<Loadable>, PluginError> {
            *self.examined.lock().unwrap() += 1;
            Ok(self.proposals.clone())
        }

        fn load(&self, loadable: &Loadable) -> Result<(), PluginError> {
            self.loaded.lock().unwrap().push(loadable.clone());
            Ok(())
        }
    }

    #[test]
    fn select_best_picks_largest() {
        let loadables = vec![loadable("a", 3), loadable("b", 7), loadable("c", 1)];
        assert_eq!(select_best(&loadables), Some(1));
    }

    #[test]
    fn select_best_first_wins_ties() {
        let loadables = vec![loadable("a", 2), loadable("b", 5), loadable("c", 5)];
        assert_eq!(select_best(&loadables), Some(1));
    }

    #[test]
    fn select_best_defaults_to_first_when_all_empty() {
        let loadables = vec![loadable("a", 0), loadable("b", 0)];
        assert_eq!(select_best(&loadables), Some(0));
        assert_eq!(select_best(&[]), None);
    }

    #[test]
    fn largest_loadable_of_first_plugin_is_loaded() {
        let volume = FixedPlugin::new(
            "volume",
            vec![loadable("a", 3), loadable("b", 7), loadable("c", 1)],
        );
        let seg = FixedPlugin::new("seg", vec![loadable("huge", 50)]);
        let plugins: Vec<Arc<dyn ImportPlugin>> = vec![volume.clone(), seg.clone()];

        let outcome = ImportSelector::new(&plugins).import(&[]).unwrap();

        match outcome {
            ImportOutcome::Loaded { plugin, loadable } => {
                assert_eq!(plugin, "volume");
                assert_eq!(loadable.name, "b");
                assert_eq!(loadable.file_count(), 7);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(volume.loaded.lock().unwrap().len(), 1);
        assert_eq!(*seg.examined.lock().unwrap(), 0);
    }

    #[test]
    fn falls_through_to_second_plugin_and_skips_third() {
        let volume = FixedPlugin::new("volume", vec![]);
        let seg = FixedPlugin::new("seg", vec![loadable("mask", 1)]);
        let rt = FixedPlugin::new("rtstruct", vec![loadable("contours", 4)]);
        let plugins: Vec<Arc<dyn ImportPlugin>> = vec![volume.clone(), seg.clone(), rt.clone()];

        let outcome = ImportSelector::new(&plugins).import(&[]).unwrap();

        assert!(outcome.is_loaded());
        assert_eq!(*volume.examined.lock().unwrap(), 1);
        assert_eq!(*seg.examined.lock().unwrap(), 1);
        assert_eq!(*rt.examined.lock().unwrap(), 0);
        assert_eq!(seg.loaded.lock().unwrap()[0].name, "mask");
        assert!(rt.loaded.lock().unwrap().is_empty());
    }

    #[test]
    fn no_loadables_is_reported_not_raised() {
        let plugins: Vec<Arc<dyn ImportPlugin>> = vec![
            FixedPlugin::new("volume", vec![]),
            FixedPlugin::new("seg", vec![]),
        ];

        let outcome = ImportSelector::new(&plugins).import(&[]).unwrap();
        assert_eq!(outcome, ImportOutcome::NoLoadable);
    }
}
