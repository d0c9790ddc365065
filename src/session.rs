use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, warn};
use uuid::Uuid;

/// Session type recorded after a DICOM folder is downloaded and loaded
pub const DICOM_DOWNLOAD_SESSION: &str = "dicom download";

/// Origin of loaded data, kept so it can be uploaded back later
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionArgs {
    pub id: Uuid,
    pub source: String,
    pub session_type: String,
    pub started_at: DateTime<Utc>,
}

impl SessionArgs {
    pub fn dicom_download(source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            session_type: DICOM_DOWNLOAD_SESSION.to_string(),
            started_at: Utc::now(),
        }
    }
}

pub trait SessionTracker: Send + Sync {
    fn start_session(&self, args: SessionArgs);
}

/// Appends one JSON object per session to a file
#[derive(Debug, Clone)]
pub struct JsonlSessionLog {
    path: PathBuf,
}

impl JsonlSessionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn append(&self, args: &SessionArgs) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(args)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

impl SessionTracker for JsonlSessionLog {
    fn start_session(&self, args: SessionArgs) {
        match self.append(&args) {
            Ok(()) => debug!("Recorded session {} for {}", args.id, args.source),
            Err(e) => warn!(
                "Failed to record session for {} in {}: {}",
                args.source,
                self.path.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_are_appended_as_json_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = JsonlSessionLog::new(dir.path().join("nested/sessions.jsonl"));

        log.start_session(SessionArgs::dicom_download("/data/experiments/E1"));
        log.start_session(SessionArgs::dicom_download("/data/experiments/E2"));

        let text = std::fs::read_to_string(dir.path().join("nested/sessions.jsonl")).unwrap();
        let records: Vec<SessionArgs> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source, "/data/experiments/E1");
        assert_eq!(records[1].session_type, DICOM_DOWNLOAD_SESSION);
        assert_ne!(records[0].id, records[1].id);
    }
}
