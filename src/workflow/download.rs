//! Download, cache and import of a remote DICOM folder.

use crate::cache::{CacheCheck, CacheReconciler};
use crate::classify::{DicomClassifier, ExtensionClassifier};
use crate::database::{register_with_retry, DicomDatabase};
use crate::error::{Result, WorkflowError};
use crate::remote::RemoteRepository;
use crate::selection::{load_from_database, ImportOutcome, ImportPlugin};
use crate::session::{SessionArgs, SessionTracker};
use crate::staging::StagingArea;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const DEFAULT_SPLITTER: &str = "/experiments/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotStarted,
    CacheHit,
    Downloading,
    Extracting,
    Indexing,
    Importing,
    /// `true` when a loadable was loaded
    Done(bool),
    Failed,
}

/// User-facing messages the workflow cannot resolve on its own
pub trait Notifier: Send + Sync {
    /// Report why the load stopped
    fn terminate(&self, title: &str, message: &str);

    /// Send the user to where the DICOM database is configured
    fn open_database_setup(&self);
}

/// A remote folder and the file URIs it contains
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub source_uri: String,
    pub file_uris: Vec<String>,
}

impl LoadRequest {
    pub fn new(source_uri: impl Into<String>, file_uris: Vec<String>) -> Self {
        Self {
            source_uri: source_uri.into(),
            file_uris,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Served from the local database without downloading
    pub from_cache: bool,
    pub outcome: ImportOutcome,
}

pub struct DicomLoader {
    remote: Arc<dyn RemoteRepository>,
    staging: Arc<dyn StagingArea>,
    notifier: Arc<dyn Notifier>,
    database: Option<Arc<dyn DicomDatabase>>,
    classifier: Arc<dyn DicomClassifier>,
    plugins: Vec<Arc<dyn ImportPlugin>>,
    sessions: Option<Arc<dyn SessionTracker>>,
    splitter: String,
    state: LoadState,
    cached_files: Vec<PathBuf>,
}

impl DicomLoader {
    pub fn new(
        remote: Arc<dyn RemoteRepository>,
        staging: Arc<dyn StagingArea>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            remote,
            staging,
            notifier,
            database: None,
            classifier: Arc::new(ExtensionClassifier::default()),
            plugins: Vec::new(),
            sessions: None,
            splitter: DEFAULT_SPLITTER.to_string(),
            state: LoadState::NotStarted,
            cached_files: Vec::new(),
        }
    }

    pub fn with_database(mut self, database: Arc<dyn DicomDatabase>) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn DicomClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Plugins in priority order
    pub fn with_plugins(mut self, plugins: Vec<Arc<dyn ImportPlugin>>) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn with_session_tracker(mut self, sessions: Arc<dyn SessionTracker>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn with_splitter(mut self, splitter: impl Into<String>) -> Self {
        self.splitter = splitter.into();
        self
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Files matched by the last cache check
    pub fn cached_files(&self) -> &[PathBuf] {
        &self.cached_files
    }

    /// Reconcile `file_uris` against the database and remember the matches.
    /// Without a database nothing is cached.
    pub fn check_cache(&mut self, file_uris: &[String]) -> Result<bool> {
        let Some(db) = self.database.as_ref() else {
            self.cached_files.clear();
            return Ok(false);
        };

        let indexed = db.all_files()?;
        let check: CacheCheck =
            CacheReconciler::new(self.classifier.as_ref(), &self.splitter).check(file_uris, &indexed);
        let hit = check.is_full_hit();
        self.cached_files = check.matched;
        Ok(hit)
    }

    /// Run the whole workflow for one remote folder.
    pub async fn load(&mut self, request: &LoadRequest) -> Result<LoadReport> {
        self.state = LoadState::NotStarted;
        let result = self.run(request).await;
        match &result {
            Ok(report) => {
                self.state = LoadState::Done(report.outcome.is_loaded());
                if report.outcome.is_loaded() {
                    if let Some(sessions) = &self.sessions {
                        sessions.start_session(SessionArgs::dicom_download(&request.source_uri));
                    }
                }
            }
            Err(e) => {
                error!("DICOM load of '{}' failed: {}", request.source_uri, e);
                self.state = LoadState::Failed;
            }
        }
        result
    }

    async fn run(&mut self, request: &LoadRequest) -> Result<LoadReport> {
        let hit = self.check_cache(&request.file_uris)?;
        if let (true, Some(db)) = (hit, self.database.clone()) {
            self.state = LoadState::CacheHit;
            info!(
                "♻️  Using {} cached files for {}",
                self.cached_files.len(),
                request.source_uri
            );
            let files = self.cached_files.clone();
            let outcome = self.import(db.as_ref(), &files)?;
            return Ok(LoadReport {
                from_cache: true,
                outcome,
            });
        }

        self.state = LoadState::Downloading;
        let archive = self.staging.archive_path(&request.source_uri)?;
        self.remote
            .download_archive(&request.source_uri, &archive)
            .await
            .map_err(|source| WorkflowError::DownloadFailed {
                uri: request.source_uri.clone(),
                source,
            })?;

        if !self.staging.exists(&archive) {
            return Err(WorkflowError::StagingMissing(archive));
        }

        let Some(db) = self.database.clone() else {
            let message = format!(
                "It doesn't look like your DICOM database directory is set up. \
                 Please set it up in the DICOM module. You can load your \
                 downloaded files here: '{}'.",
                archive.display()
            );
            self.notifier.terminate("DICOM load", &message);
            self.notifier.open_database_setup();
            return Err(WorkflowError::DatabaseUnavailable(archive));
        };

        self.state = LoadState::Extracting;
        let extracted = self.staging.extract(&archive)?;

        self.state = LoadState::Indexing;
        register_with_retry(db.as_ref(), &extracted)?;
        if let Err(e) = self.staging.remove(&archive) {
            warn!("Could not remove staged archive: {}", e);
        }

        let outcome = self.import(db.as_ref(), &extracted)?;
        Ok(LoadReport {
            from_cache: false,
            outcome,
        })
    }

    fn import(&mut self, db: &dyn DicomDatabase, files: &[PathBuf]) -> Result<ImportOutcome> {
        self.state = LoadState::Importing;
        load_from_database(db, &self.plugins, files)
    }
}
