use crate::plugins::{add_to_scene, read_headers};
use crate::scene::Scene;
use crate::selection::{ImportPlugin, Loadable, PluginError};
use dicom_dictionary_std::uids;
use dicom_probe::DicomSummary;
use std::path::PathBuf;
use std::sync::Arc;

/// Modalities that never carry an image volume
const NON_IMAGE_MODALITIES: &[&str] = &["SEG", "RTSTRUCT", "RTPLAN", "RTDOSE", "SR", "PR", "KO"];

/// Claims image series, one loadable per series ordered by instance number
pub struct ScalarVolumePlugin {
    scene: Arc<dyn Scene>,
}

impl ScalarVolumePlugin {
    pub const NAME: &'static str = "scalar volume";

    pub fn new(scene: Arc<dyn Scene>) -> Self {
        Self { scene }
    }

    fn is_image(header: &DicomSummary) -> bool {
        let modality = header.modality_upper();
        !NON_IMAGE_MODALITIES.contains(&modality.as_str())
            && !header.has_sop_class(uids::SEGMENTATION_STORAGE)
            && !header.has_sop_class(uids::RT_STRUCTURE_SET_STORAGE)
    }
}

impl ImportPlugin for ScalarVolumePlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn examine(&self, file_groups: &[Vec<PathBuf>]) -> Result<Vec<Loadable>, PluginError> {
        // Series in order of first appearance
        let mut series: Vec<(Option<String>, Vec<DicomSummary>)> = Vec::new();
        for header in read_headers(file_groups).into_iter().filter(Self::is_image) {
            match series
                .iter_mut()
                .find(|(uid, _)| *uid == header.series_instance_uid)
            {
                Some((_, members)) => members.push(header),
                None => series.push((header.series_instance_uid.clone(), vec![header])),
            }
        }

        Ok(series
            .into_iter()
            .map(|(uid, mut members)| {
                members.sort_by_key(|h| h.instance_number.unwrap_or(i64::MAX));
                let name = members
                    .iter()
                    .find_map(|h| h.series_description.clone())
                    .or_else(|| uid.clone())
                    .unwrap_or_else(|| "Unnamed series".to_string());
                let files = members.into_iter().map(|h| h.path).collect();
                let loadable = Loadable::new(name, files);
                match uid {
                    Some(uid) => loadable.with_series(uid),
                    None => loadable,
                }
            })
            .collect())
    }

    fn load(&self, loadable: &Loadable) -> Result<(), PluginError> {
        add_to_scene(self.scene.as_ref(), Self::NAME, loadable)
    }
}
