use anvil_types::SceneDescription;
use serde::Serialize;
use tracing::debug;

use crate::errors::SaveError;
use crate::metadata::ProjectMetadata;

/// Format identifier written to every project file.
pub const FORMAT_ID: &str = "anvil";

/// Current file format version.
pub const FORMAT_VERSION: u32 = 2;

/// Options for [`save_project_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Write memoized cut results. Without them the file is smaller, and the
    /// results are recomputed by a rebuild pass after loading.
    pub include_cached_meshes: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            include_cached_meshes: true,
        }
    }
}

/// The top-level file structure.
#[derive(Debug, Serialize)]
struct AnvilFile<'a> {
    format: &'a str,
    version: u32,
    project: &'a ProjectMetadata,
    scene: &'a SceneDescription,
}

/// Serialize a project to a pretty-printed JSON string, cached results
/// included.
pub fn save_project(
    scene: &SceneDescription,
    metadata: &ProjectMetadata,
) -> Result<String, SaveError> {
    save_project_with(scene, metadata, SaveOptions::default())
}

pub fn save_project_with(
    scene: &SceneDescription,
    metadata: &ProjectMetadata,
    options: SaveOptions,
) -> Result<String, SaveError> {
    let stripped;
    let scene = if options.include_cached_meshes {
        scene
    } else {
        stripped = strip_cached_meshes(scene);
        &stripped
    };
    let file = AnvilFile {
        format: FORMAT_ID,
        version: FORMAT_VERSION,
        project: metadata,
        scene,
    };
    let json = serde_json::to_string_pretty(&file)
        .map_err(|e| SaveError::SerializeError(e.to_string()))?;
    debug!(
        bodies = scene.bodies.len(),
        cached = scene.cached_feature_count(),
        bytes = json.len(),
        "saved project"
    );
    Ok(json)
}

fn strip_cached_meshes(scene: &SceneDescription) -> SceneDescription {
    let mut scene = scene.clone();
    for feature in scene.bodies.iter_mut().flat_map(|b| b.features.iter_mut()) {
        feature.invalidate();
    }
    scene
}
