use anvil_types::{Body, BodyId, FeatureId};
use serde::{Deserialize, Serialize};

use crate::scene::SceneState;
use crate::types::EngineError;

/// One row of a body's feature outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub feature_id: FeatureId,
    pub name: String,
    /// Operation label, e.g. "Cut Extrude".
    pub label: String,
    /// True when the feature has a memoized result.
    pub cached: bool,
    /// Features that consume this one (only sketches have children).
    pub children: Vec<OutlineNode>,
}

/// Parent/child view of a body's features.
///
/// Features that consume a sketch nest under it. A feature whose sketch is
/// missing, or comes later in the list, is shown at the root level.
pub fn feature_outline(body: &Body) -> Vec<OutlineNode> {
    let mut roots: Vec<OutlineNode> = Vec::new();
    for (index, feature) in body.features.iter().enumerate() {
        let node = OutlineNode {
            feature_id: feature.id,
            name: feature.name.clone(),
            label: feature.operation.label(),
            cached: feature.cached_mesh.is_some(),
            children: Vec::new(),
        };
        let parent = feature.sketch_ref().filter(|sketch_id| {
            body.features[..index]
                .iter()
                .any(|f| f.id == *sketch_id && f.is_sketch())
        });
        match parent.and_then(|id| roots.iter_mut().find(|n| n.feature_id == id)) {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }
    roots
}

impl SceneState {
    pub fn outline(&self, body_id: BodyId) -> Result<Vec<OutlineNode>, EngineError> {
        Ok(feature_outline(self.body(body_id)?))
    }
}
