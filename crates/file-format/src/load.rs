use anvil_types::SceneDescription;
use serde::Deserialize;
use tracing::info;

use crate::errors::LoadError;
use crate::metadata::ProjectMetadata;
use crate::migrate::migrate;
use crate::save::{FORMAT_ID, FORMAT_VERSION};

/// Format identifier and version, read before the payload so the payload
/// can be parsed with the right schema.
#[derive(Debug, Deserialize)]
struct FileHeader {
    format: String,
    version: u32,
}

/// Deserialize a project from a JSON string.
///
/// Validates the format identifier and version, then migrates files written
/// by older versions. Cached results in the file are kept as they are.
pub fn load_project(json: &str) -> Result<(SceneDescription, ProjectMetadata), LoadError> {
    let document: serde_json::Value =
        serde_json::from_str(json).map_err(|e| LoadError::ParseError(e.to_string()))?;
    let header: FileHeader = serde_json::from_value(document.clone())
        .map_err(|e| LoadError::ParseError(e.to_string()))?;

    if header.format != FORMAT_ID {
        return Err(LoadError::UnknownFormat(header.format));
    }
    if header.version > FORMAT_VERSION {
        return Err(LoadError::FutureVersion {
            file_version: header.version,
            supported_version: FORMAT_VERSION,
        });
    }

    let (scene, project) = migrate(document, header.version)?;
    info!(
        version = header.version,
        bodies = scene.bodies.len(),
        cached = scene.cached_feature_count(),
        "loaded project"
    );
    Ok((scene, project))
}
