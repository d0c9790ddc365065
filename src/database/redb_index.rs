use crate::database::{DatabaseError, DicomDatabase, Result};
use dicom_probe::DicomSummary;
use redb::{Database, ReadableTable, TableDefinition, TableError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Schema marker; its presence means the index was initialized
const META: TableDefinition<&str, &str> = TableDefinition::new("meta");
/// file path -> series instance UID
const FILES: TableDefinition<&str, &str> = TableDefinition::new("files");
/// series instance UID -> study instance UID
const SERIES: TableDefinition<&str, &str> = TableDefinition::new("series");
/// study instance UID -> patient ID
const STUDIES: TableDefinition<&str, &str> = TableDefinition::new("studies");
/// patient ID -> patient name
const PATIENTS: TableDefinition<&str, &str> = TableDefinition::new("patients");

/// `patient\0study` -> ""
const PATIENT_STUDIES: TableDefinition<&str, &str> = TableDefinition::new("patient_studies");
/// `study\0series` -> ""
const STUDY_SERIES: TableDefinition<&str, &str> = TableDefinition::new("study_series");
/// `series\0path` -> ""
const SERIES_FILES: TableDefinition<&str, &str> = TableDefinition::new("series_files");

const SCHEMA_VERSION: &str = "1";

/// Separates parent and child in the reverse index keys; never part of a UID or path
const KEY_SEP: char = '\0';

fn child_key(parent: &str, child: &str) -> String {
    format!("{}{}{}", parent, KEY_SEP, child)
}

/// Placeholder for instances missing an identifying UID
pub const UNKNOWN_ID: &str = "UNKNOWN";

fn storage<E: Into<redb::Error>>(e: E) -> DatabaseError {
    DatabaseError::Storage(e.into())
}

/// DICOM index persisted in a redb file
#[derive(Clone)]
pub struct RedbDicomDatabase {
    db: Arc<Database>,
    path: PathBuf,
}

impl std::fmt::Debug for RedbDicomDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbDicomDatabase")
            .field("path", &self.path)
            .finish()
    }
}

impl RedbDicomDatabase {
    /// Open (or create) the database file. The schema is not created here;
    /// call [`DicomDatabase::initialize`] for that.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| DatabaseError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        debug!("🆕 Opening DICOM database: {}", path.display());
        let db = Database::create(&path).map_err(storage)?;
        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    fn is_initialized(&self) -> Result<bool> {
        let txn = self.db.begin_read().map_err(storage)?;
        match txn.open_table(META) {
            Ok(_) => Ok(true),
            Err(TableError::TableDoesNotExist(_)) => Ok(false),
            Err(e) => Err(storage(e)),
        }
    }

    /// All `(key, value)` pairs of a table; a missing table reads as empty.
    fn entries(&self, table: TableDefinition<&str, &str>) -> Result<Vec<(String, String)>> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = match txn.open_table(table) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(storage(e)),
        };

        let mut out = Vec::new();
        for item in table.iter().map_err(storage)? {
            let (k, v) = item.map_err(storage)?;
            out.push((k.value().to_string(), v.value().to_string()));
        }
        Ok(out)
    }

    /// Children of `parent` in a reverse index table, via a prefix range scan
    fn children(&self, table: TableDefinition<&str, &str>, parent: &str) -> Result<Vec<String>> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = match txn.open_table(table) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(storage(e)),
        };

        let prefix = child_key(parent, "");
        let mut out = Vec::new();
        for item in table.range(prefix.as_str()..).map_err(storage)? {
            let (k, _) = item.map_err(storage)?;
            match k.value().strip_prefix(prefix.as_str()) {
                Some(child) => out.push(child.to_string()),
                None => break,
            }
        }
        Ok(out)
    }

    fn probe(path: &Path) -> Option<DicomSummary> {
        match dicom_probe::is_part10(path) {
            Ok(true) => {}
            Ok(false) => {
                debug!("Skipping non-DICOM file {}", path.display());
                return None;
            }
            Err(e) => {
                warn!("Skipping unreadable file: {}", e);
                return None;
            }
        }
        match dicom_probe::probe_file(path) {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!("Skipping file: {}", e);
                None
            }
        }
    }
}

impl DicomDatabase for RedbDicomDatabase {
    fn all_files(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .entries(FILES)?
            .into_iter()
            .map(|(k, _)| PathBuf::from(k))
            .collect())
    }

    fn patients(&self) -> Result<Vec<String>> {
        Ok(self.entries(PATIENTS)?.into_iter().map(|(k, _)| k).collect())
    }

    fn studies_for_patient(&self, patient: &str) -> Result<Vec<String>> {
        self.children(PATIENT_STUDIES, patient)
    }

    fn series_for_study(&self, study: &str) -> Result<Vec<String>> {
        self.children(STUDY_SERIES, study)
    }

    fn files_for_series(&self, series: &str) -> Result<Vec<PathBuf>> {
        Ok(self
            .children(SERIES_FILES, series)?
            .into_iter()
            .map(PathBuf::from)
            .collect())
    }

    fn register_files(&self, files: &[PathBuf]) -> Result<usize> {
        if !self.is_initialized()? {
            return Err(DatabaseError::Uninitialized);
        }

        let summaries: Vec<DicomSummary> = files.iter().filter_map(|p| Self::probe(p)).collect();

        let txn = self.db.begin_write().map_err(storage)?;
        {
            let mut files_t = txn.open_table(FILES).map_err(storage)?;
            let mut series_t = txn.open_table(SERIES).map_err(storage)?;
            let mut studies_t = txn.open_table(STUDIES).map_err(storage)?;
            let mut patients_t = txn.open_table(PATIENTS).map_err(storage)?;
            let mut patient_studies_t = txn.open_table(PATIENT_STUDIES).map_err(storage)?;
            let mut study_series_t = txn.open_table(STUDY_SERIES).map_err(storage)?;
            let mut series_files_t = txn.open_table(SERIES_FILES).map_err(storage)?;

            for s in &summaries {
                let path = s.path.to_string_lossy();
                let series = s.series_instance_uid.as_deref().unwrap_or(UNKNOWN_ID);
                let study = s.study_instance_uid.as_deref().unwrap_or(UNKNOWN_ID);
                let patient = s.patient_id.as_deref().unwrap_or(UNKNOWN_ID);
                let name = s.patient_name.as_deref().unwrap_or("");

                // A re-registered file may have moved to another series
                let previous = files_t
                    .insert(&*path, series)
                    .map_err(storage)?
                    .map(|old| old.value().to_string());
                if let Some(old_series) = previous.filter(|old| old != series) {
                    series_files_t
                        .remove(child_key(&old_series, &path).as_str())
                        .map_err(storage)?;
                }
                series_files_t
                    .insert(child_key(series, &path).as_str(), "")
                    .map_err(storage)?;

                if let Some(old_study) = series_t
                    .insert(series, study)
                    .map_err(storage)?
                    .map(|old| old.value().to_string())
                    .filter(|old| old != study)
                {
                    study_series_t
                        .remove(child_key(&old_study, series).as_str())
                        .map_err(storage)?;
                }
                study_series_t
                    .insert(child_key(study, series).as_str(), "")
                    .map_err(storage)?;

                if let Some(old_patient) = studies_t
                    .insert(study, patient)
                    .map_err(storage)?
                    .map(|old| old.value().to_string())
                    .filter(|old| old != patient)
                {
                    patient_studies_t
                        .remove(child_key(&old_patient, study).as_str())
                        .map_err(storage)?;
                }
                patient_studies_t
                    .insert(child_key(patient, study).as_str(), "")
                    .map_err(storage)?;

                patients_t.insert(patient, name).map_err(storage)?;
            }
        }
        txn.commit().map_err(storage)?;

        info!(
            "🗄️  Indexed {} of {} files into {}",
            summaries.len(),
            files.len(),
            self.path.display()
        );
        Ok(summaries.len())
    }

    fn initialize(&self) -> Result<()> {
        let txn = self.db.begin_write().map_err(storage)?;
        {
            let mut meta = txn.open_table(META).map_err(storage)?;
            meta.insert("schema_version", SCHEMA_VERSION).map_err(storage)?;
            for table in [
                FILES,
                SERIES,
                STUDIES,
                PATIENTS,
                PATIENT_STUDIES,
                STUDY_SERIES,
                SERIES_FILES,
            ] {
                txn.open_table(table).map_err(storage)?;
            }
        }
        txn.commit().map_err(storage)?;

        info!("✅ DICOM database initialized: {}", self.path.display());
        Ok(())
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}
