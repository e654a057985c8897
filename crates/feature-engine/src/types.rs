use anvil_types::{BodyId, ElementId, FeatureId, Operation};
use serde::{Deserialize, Serialize};

/// Partial update of a feature. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeaturePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
}

impl FeaturePatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            operation: None,
        }
    }

    pub fn operation(operation: Operation) -> Self {
        Self {
            name: None,
            operation: Some(operation),
        }
    }
}

/// What the user has picked in the scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub bodies: Vec<BodyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<(BodyId, FeatureId)>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty() && self.feature.is_none()
    }

    /// Drop everything that refers to `body_id`.
    pub fn forget_body(&mut self, body_id: BodyId) {
        self.bodies.retain(|b| *b != body_id);
        if matches!(self.feature, Some((b, _)) if b == body_id) {
            self.feature = None;
        }
    }
}

/// Errors from the feature engine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("body not found: {id}")]
    BodyNotFound { id: BodyId },

    #[error("body already exists: {id}")]
    DuplicateBody { id: BodyId },

    #[error("feature not found: {id}")]
    FeatureNotFound { id: FeatureId },

    #[error("sketch not found: {id}")]
    SketchNotFound { id: FeatureId },

    #[error("feature {id} is not a {expected} feature")]
    WrongOperation { id: FeatureId, expected: &'static str },

    #[error("boolean needs two different bodies, got {id} twice")]
    SameBody { id: BodyId },

    #[error("sketch element not found: {id}")]
    ElementNotFound { id: ElementId },

    #[error("constraint index {index} out of range ({count} constraints)")]
    ConstraintOutOfRange { index: usize, count: usize },

    #[error("no arc passes through collinear points")]
    DegenerateArc,

    #[error(transparent)]
    KernelError(#[from] kernel_bridge::KernelError),

    #[error("operation error: {0}")]
    OpError(#[from] modeling_ops::OpError),
}
