use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::feature::{BodyId, Feature, FeatureId};
use crate::geometry::BooleanOp;

fn default_true() -> bool {
    true
}

/// A named solid: the ordered construction history that produces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub id: BodyId,
    pub name: String,
    /// False once the body was consumed by a boolean or hidden by the user.
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Construction steps, applied in order.
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl Body {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            visible: true,
            features: Vec::new(),
        }
    }

    pub fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn feature_mut(&mut self, id: FeatureId) -> Option<&mut Feature> {
        self.features.iter_mut().find(|f| f.id == id)
    }

    pub fn feature_index(&self, id: FeatureId) -> Option<usize> {
        self.features.iter().position(|f| f.id == id)
    }

    /// Bodies this body reads geometry from.
    pub fn tool_bodies(&self) -> Vec<BodyId> {
        self.features
            .iter()
            .filter_map(|f| f.operation.tool_body())
            .collect()
    }

    /// Index of the last feature carrying a memoized result. Evaluation
    /// resumes after it.
    pub fn checkpoint_index(&self) -> Option<usize> {
        self.features.iter().rposition(|f| f.cached_mesh.is_some())
    }

    /// Uncached cuts after the checkpoint, in list order. Uncached cuts
    /// before it are already folded into the checkpoint's result.
    pub fn pending_cuts(&self) -> impl Iterator<Item = &Feature> {
        let start = self.checkpoint_index().map_or(0, |i| i + 1);
        self.features[start..].iter().filter(|f| f.needs_rebuild())
    }

    /// Any cut step still waiting for its memoized result.
    pub fn has_uncached_cuts(&self) -> bool {
        self.pending_cuts().next().is_some()
    }
}

/// Where the result of a body-to-body boolean ends up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BooleanResult {
    /// The left body keeps the combined result; the right body is consumed.
    MergeIntoLeft,
    /// The right body keeps the combined result; the left body is consumed.
    MergeIntoRight,
    /// A new body holds the result; both operands stay as they are.
    CreateNewBody {
        new_body_id: BodyId,
        new_body_name: String,
    },
}

impl BooleanResult {
    pub fn create_new_body(name: impl Into<String>) -> Self {
        BooleanResult::CreateNewBody {
            new_body_id: Uuid::new_v4(),
            new_body_name: name.into(),
        }
    }
}

/// Record of a boolean combination between two bodies. Never edited;
/// re-running the combination records a new operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyOperation {
    pub id: Uuid,
    pub op: BooleanOp,
    pub left_body_id: BodyId,
    pub right_body_id: BodyId,
    pub result: BooleanResult,
}

impl BodyOperation {
    pub fn references(&self, body_id: BodyId) -> bool {
        self.left_body_id == body_id || self.right_body_id == body_id
    }
}

/// The whole design: bodies and the boolean operations between them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub bodies: Vec<Body>,
    #[serde(default)]
    pub body_operations: Vec<BodyOperation>,
}

impl SceneDescription {
    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.iter_mut().find(|b| b.id == id)
    }

    /// Number of features carrying a memoized mesh, across all bodies.
    pub fn cached_feature_count(&self) -> usize {
        self.bodies
            .iter()
            .flat_map(|b| &b.features)
            .filter(|f| f.cached_mesh.is_some())
            .count()
    }
}
