//! Lightweight DICOM header probing.
//!
//! Reads the identifying attributes of a Part 10 file (patient, study,
//! series, instance, SOP class, modality) and stops before pixel data, so
//! large image files can be indexed cheaply.

use dicom_dictionary_std::tags;
use dicom_object::mem::InMemDicomObject;
use dicom_object::{FileDicomObject, OpenFileOptions};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Magic code that follows the 128-byte preamble of a Part 10 file
pub const DICM_MAGIC: &[u8; 4] = b"DICM";

/// Length of the Part 10 preamble
pub const PREAMBLE_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("IO error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' is not a readable DICOM file: {message}")]
    NotDicom { path: PathBuf, message: String },

    #[error("Failed to write DICOM file '{path}': {message}")]
    Write { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, ProbeError>;

/// Identifying attributes of one DICOM instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DicomSummary {
    pub path: PathBuf,
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub study_instance_uid: Option<String>,
    pub series_instance_uid: Option<String>,
    pub series_description: Option<String>,
    pub instance_number: Option<i64>,
    pub sop_instance_uid: Option<String>,
    pub sop_class_uid: Option<String>,
    pub modality: Option<String>,
}

impl DicomSummary {
    /// Modality in upper case, or an empty string when absent
    pub fn modality_upper(&self) -> String {
        self.modality
            .as_deref()
            .map(|m| m.to_ascii_uppercase())
            .unwrap_or_default()
    }

    pub fn has_sop_class(&self, uid: &str) -> bool {
        self.sop_class_uid.as_deref() == Some(uid)
    }
}

/// Check for the `DICM` magic after the preamble.
///
/// Returns `Ok(false)` for files that are too short; only genuine IO
/// failures are reported as errors.
pub fn is_part10(path: &Path) -> Result<bool> {
    let mut file = File::open(path).map_err(|source| ProbeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut head = [0u8; PREAMBLE_LEN + 4];
    match file.read_exact(&mut head) {
        Ok(()) => Ok(&head[PREAMBLE_LEN..] == DICM_MAGIC),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(source) => Err(ProbeError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read the header of a Part 10 file up to (not including) pixel data.
pub fn probe_file(path: &Path) -> Result<DicomSummary> {
    let obj = OpenFileOptions::new()
        .read_until(tags::PIXEL_DATA)
        .open_file(path)
        .map_err(|e| ProbeError::NotDicom {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(summarize(path, &obj))
}

fn summarize(path: &Path, obj: &FileDicomObject<InMemDicomObject>) -> DicomSummary {
    DicomSummary {
        path: path.to_path_buf(),
        patient_id: text(obj, tags::PATIENT_ID),
        patient_name: text(obj, tags::PATIENT_NAME),
        study_instance_uid: text(obj, tags::STUDY_INSTANCE_UID),
        series_instance_uid: text(obj, tags::SERIES_INSTANCE_UID),
        series_description: text(obj, tags::SERIES_DESCRIPTION),
        instance_number: text(obj, tags::INSTANCE_NUMBER).and_then(|n| n.parse().ok()),
        sop_instance_uid: text(obj, tags::SOP_INSTANCE_UID),
        sop_class_uid: text(obj, tags::SOP_CLASS_UID),
        modality: text(obj, tags::MODALITY),
    }
}

// UI values are padded with NUL, other strings with spaces
fn text(obj: &InMemDicomObject, tag: dicom_core::Tag) -> Option<String> {
    obj.element(tag)
        .ok()
        .and_then(|e| e.to_str().ok())
        .map(|s| s.trim_end_matches('\0').trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Write a dataset as a Part 10 file with Explicit VR Little Endian.
///
/// The SOP class and instance UIDs of the file meta group are taken from the
/// dataset.
pub fn write_part10(path: &Path, obj: &InMemDicomObject) -> Result<()> {
    use dicom_dictionary_std::uids;
    use dicom_object::meta::FileMetaTableBuilder;

    let sop_class = text(obj, tags::SOP_CLASS_UID)
        .unwrap_or_else(|| uids::SECONDARY_CAPTURE_IMAGE_STORAGE.to_string());
    let sop_instance = text(obj, tags::SOP_INSTANCE_UID).unwrap_or_else(|| "2.25.1".to_string());

    let file_obj = obj
        .clone()
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                .media_storage_sop_class_uid(sop_class.as_str())
                .media_storage_sop_instance_uid(sop_instance.as_str()),
        )
        .map_err(|e| ProbeError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    file_obj.write_to_file(path).map_err(|e| ProbeError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
