//! Header-based DICOM import plugins.
//!
//! Each plugin reads the headers of the files it is offered, proposes the
//! groupings it can import, and records the one it is asked to load in a
//! [`Scene`].

use crate::scene::Scene;
use crate::selection::{ImportPlugin, Loadable, PluginError};
use dicom_probe::DicomSummary;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub mod rtstruct;
pub mod scalar_volume;
pub mod segmentation;

pub use rtstruct::RtStructPlugin;
pub use scalar_volume::ScalarVolumePlugin;
pub use segmentation::SegmentationPlugin;

/// The default plugins in priority order: scalar volume, segmentation,
/// RT structure set.
pub fn default_plugins(scene: Arc<dyn Scene>) -> Vec<Arc<dyn ImportPlugin>> {
    vec![
        Arc::new(ScalarVolumePlugin::new(scene.clone())),
        Arc::new(SegmentationPlugin::new(scene.clone())),
        Arc::new(RtStructPlugin::new(scene)),
    ]
}

/// Headers of every readable DICOM file across the groups
pub(crate) fn read_headers(file_groups: &[Vec<PathBuf>]) -> Vec<DicomSummary> {
    file_groups
        .iter()
        .flatten()
        .filter_map(|path| match dicom_probe::probe_file(path) {
            Ok(summary) => Some(summary),
            Err(e) => {
                debug!("Not examining {}: {}", path.display(), e);
                None
            }
        })
        .collect()
}

/// One loadable per file of the given SOP class
pub(crate) fn per_instance_loadables(
    headers: &[DicomSummary],
    sop_class_uid: &str,
    label: &str,
) -> Vec<Loadable> {
    headers
        .iter()
        .filter(|h| h.has_sop_class(sop_class_uid))
        .map(|h| {
            let name = match &h.series_description {
                Some(desc) => format!("{}: {}", label, desc),
                None => format!("{}: {}", label, h.path.display()),
            };
            let loadable = Loadable::new(name, vec![h.path.clone()]);
            match &h.series_instance_uid {
                Some(series) => loadable.with_series(series.clone()),
                None => loadable,
            }
        })
        .collect()
}

pub(crate) fn add_to_scene(
    scene: &dyn Scene,
    plugin: &str,
    loadable: &Loadable,
) -> Result<(), PluginError> {
    scene
        .add(plugin, loadable)
        .map(|_| ())
        .map_err(|e| PluginError::Load {
            plugin: plugin.to_string(),
            loadable: loadable.name.clone(),
            message: e.to_string(),
        })
}
