use crate::plugins::{add_to_scene, per_instance_loadables, read_headers};
use crate::scene::Scene;
use crate::selection::{ImportPlugin, Loadable, PluginError};
use dicom_dictionary_std::uids;
use std::path::PathBuf;
use std::sync::Arc;

/// Claims RT Structure Set objects
pub struct RtStructPlugin {
    scene: Arc<dyn Scene>,
}

impl RtStructPlugin {
    pub const NAME: &'static str = "rtstruct";

    pub fn new(scene: Arc<dyn Scene>) -> Self {
        Self { scene }
    }
}

impl ImportPlugin for RtStructPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn examine(&self, file_groups: &[Vec<PathBuf>]) -> Result<Vec<Loadable>, PluginError> {
        let headers = read_headers(file_groups);
        Ok(per_instance_loadables(
            &headers,
            uids::RT_STRUCTURE_SET_STORAGE,
            "RT structure set",
        ))
    }

    fn load(&self, loadable: &Loadable) -> Result<(), PluginError> {
        add_to_scene(self.scene.as_ref(), Self::NAME, loadable)
    }
}
