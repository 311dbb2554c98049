use crate::error::RenamerError;
use crate::scene::SceneMetadata;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Synchronous scene lookup. `Ok(None)` means the scene does not exist.
pub trait SceneSource {
    fn find_scene(&self, id: &str) -> Result<Option<SceneMetadata>, RenamerError>;
}

impl SceneSource for HashMap<String, SceneMetadata> {
    fn find_scene(&self, id: &str) -> Result<Option<SceneMetadata>, RenamerError> {
        Ok(self.get(id).cloned())
    }
}

/// Scenes exported as `<root>/<id>.json`, one `findScene` result per file.
#[derive(Debug, Clone)]
pub struct JsonSceneDirectory {
    root: PathBuf,
}

impl JsonSceneDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SceneSource for JsonSceneDirectory {
    fn find_scene(&self, id: &str) -> Result<Option<SceneMetadata>, RenamerError> {
        if id.is_empty() || !id.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_') {
            return Ok(None);
        }

        let path = self.root.join(format!("{id}.json"));
        if !path.is_file() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&path).map_err(|err| {
            RenamerError::MetadataSource(format!("cannot read {}: {err}", path.display()))
        })?;
        let scene = serde_json::from_str::<SceneMetadata>(&raw).map_err(|err| {
            RenamerError::MetadataSource(format!("cannot parse {}: {err}", path.display()))
        })?;
        Ok(Some(scene))
    }
}
