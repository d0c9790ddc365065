#![allow(dead_code)]

use async_trait::async_trait;
use dicom_core::{DataElement, PrimitiveValue, VR};
use dicom_dictionary_std::{tags, uids};
use dicom_object::mem::InMemDicomObject;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use xnat_loader::remote::{RemoteError, RemoteRepository, RemoteResult};
use xnat_loader::session::{SessionArgs, SessionTracker};
use xnat_loader::workflow::{ConfirmPrompt, Notifier, SelectionView};

pub const STUDY_UID: &str = "1.2.826.0.1.3680043.8.498.1";
pub const SERIES_UID: &str = "1.2.826.0.1.3680043.8.498.1.1";

fn element(tag: dicom_core::Tag, vr: VR, value: &str) -> DataElement<InMemDicomObject> {
    DataElement::new(tag, vr, PrimitiveValue::from(value))
}

fn instance(sop_class: &str, sop_instance: &str, series: &str, modality: &str) -> Vec<DataElement<InMemDicomObject>> {
    vec![
        element(tags::SOP_CLASS_UID, VR::UI, sop_class),
        element(tags::SOP_INSTANCE_UID, VR::UI, sop_instance),
        element(tags::PATIENT_ID, VR::LO, "PAT001"),
        element(tags::PATIENT_NAME, VR::PN, "DOE^JANE"),
        element(tags::STUDY_INSTANCE_UID, VR::UI, STUDY_UID),
        element(tags::SERIES_INSTANCE_UID, VR::UI, series),
        element(tags::MODALITY, VR::CS, modality),
    ]
}

/// One CT slice of `series`
pub fn ct_slice(series: &str, number: u32) -> InMemDicomObject {
    let mut elements = instance(
        uids::CT_IMAGE_STORAGE,
        &format!("{}.{}", series, number),
        series,
        "CT",
    );
    elements.push(element(tags::SERIES_DESCRIPTION, VR::LO, "AXIAL"));
    elements.push(element(tags::INSTANCE_NUMBER, VR::IS, &number.to_string()));
    InMemDicomObject::from_element_iter(elements)
}

pub fn segmentation(series: &str) -> InMemDicomObject {
    let mut elements = instance(uids::SEGMENTATION_STORAGE, &format!("{}.1", series), series, "SEG");
    elements.push(element(tags::SERIES_DESCRIPTION, VR::LO, "Liver"));
    InMemDicomObject::from_element_iter(elements)
}

pub fn rtstruct(series: &str) -> InMemDicomObject {
    InMemDicomObject::from_element_iter(instance(
        uids::RT_STRUCTURE_SET_STORAGE,
        &format!("{}.1", series),
        series,
        "RTSTRUCT",
    ))
}

/// Write each object as a Part 10 file in `dir`
pub fn write_dicom_files(dir: &Path, objects: &[(&str, InMemDicomObject)]) -> Vec<PathBuf> {
    std::fs::create_dir_all(dir).expect("create dir");
    objects
        .iter()
        .map(|(name, obj)| {
            let path = dir.join(name);
            dicom_probe::write_part10(&path, obj).expect("write part 10");
            path
        })
        .collect()
}

/// Zip of Part 10 files laid out the way XNAT nests a single scan download
pub fn dicom_zip(objects: &[(&str, InMemDicomObject)]) -> Vec<u8> {
    let entries: Vec<(String, InMemDicomObject)> = objects
        .iter()
        .map(|(name, obj)| (format!("E1/scans/2/resources/DICOM/files/{}", name), obj.clone()))
        .collect();
    dicom_zip_entries(&entries)
}

/// Zip of Part 10 files at the given entry paths
pub fn dicom_zip_entries<S: AsRef<str>>(entries: &[(S, InMemDicomObject)]) -> Vec<u8> {
    let scratch = tempfile::TempDir::new().expect("tempdir");

    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (i, (entry, obj)) in entries.iter().enumerate() {
        let path = scratch.path().join(format!("{}.dcm", i));
        dicom_probe::write_part10(&path, obj).expect("write part 10");
        zip.start_file(entry.as_ref(), zip::write::FileOptions::default())
            .expect("start zip entry");
        zip.write_all(&std::fs::read(&path).expect("read dicom"))
            .expect("write zip entry");
    }
    zip.finish().expect("finish zip").into_inner()
}

/// Remote host double recording every call
#[derive(Default)]
pub struct FakeRemote {
    /// Bytes written for a download; `None` writes nothing
    pub archive: Option<Vec<u8>>,
    pub fail_delete: bool,
    pub fail_download: bool,
    pub files: Vec<String>,
    pub deleted: Mutex<Vec<String>>,
    pub downloads: Mutex<Vec<(String, PathBuf)>>,
}

impl FakeRemote {
    pub fn serving(archive: Vec<u8>) -> Self {
        Self {
            archive: Some(archive),
            ..Default::default()
        }
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn download_count(&self) -> usize {
        self.downloads.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteRepository for FakeRemote {
    async fn delete(&self, path: &str) -> RemoteResult<()> {
        if self.fail_delete {
            return Err(RemoteError::Status {
                method: "DELETE",
                url: path.to_string(),
                status: 403,
            });
        }
        self.deleted.lock().unwrap().push(path.to_string());
        Ok(())
    }

    async fn download_archive(&self, container_uri: &str, dst: &Path) -> RemoteResult<()> {
        self.downloads
            .lock()
            .unwrap()
            .push((container_uri.to_string(), dst.to_path_buf()));
        if self.fail_download {
            return Err(RemoteError::Status {
                method: "GET",
                url: container_uri.to_string(),
                status: 500,
            });
        }
        if let Some(bytes) = &self.archive {
            let io_err = |source| RemoteError::Io {
                path: dst.to_path_buf(),
                source,
            };
            std::fs::create_dir_all(dst.parent().expect("parent")).map_err(io_err)?;
            std::fs::write(dst, bytes).map_err(io_err)?;
        }
        Ok(())
    }

    async fn list_files(&self, _container_uri: &str) -> RemoteResult<Vec<String>> {
        Ok(self.files.clone())
    }
}

pub struct FakeView {
    pub uri: String,
    pub removed: Mutex<usize>,
}

impl FakeView {
    pub fn new(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            removed: Mutex::new(0),
        }
    }

    pub fn removed(&self) -> usize {
        *self.removed.lock().unwrap()
    }
}

impl SelectionView for FakeView {
    fn current_uri(&self) -> String {
        self.uri.clone()
    }

    fn remove_current_item(&self) {
        *self.removed.lock().unwrap() += 1;
    }
}

#[derive(Default)]
pub struct FakePrompt {
    pub shown: Mutex<Vec<String>>,
}

impl ConfirmPrompt for FakePrompt {
    fn show(&self, message: &str) {
        self.shown.lock().unwrap().push(message.to_string());
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    pub terminated: Mutex<Vec<(String, String)>>,
    pub setup_opened: Mutex<usize>,
}

impl Notifier for FakeNotifier {
    fn terminate(&self, title: &str, message: &str) {
        self.terminated
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }

    fn open_database_setup(&self) {
        *self.setup_opened.lock().unwrap() += 1;
    }
}

#[derive(Default)]
pub struct FakeSessions {
    pub started: Mutex<Vec<SessionArgs>>,
}

impl SessionTracker for FakeSessions {
    fn start_session(&self, args: SessionArgs) {
        self.started.lock().unwrap().push(args);
    }
}
