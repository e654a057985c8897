use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{BooleanOp, EdgeDescriptor, Primitive, Transform};
use crate::mesh::Mesh;
use crate::sketch::Sketch;

pub type FeatureId = Uuid;
pub type BodyId = Uuid;

/// One construction step in a body's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Unique identifier.
    pub id: FeatureId,
    /// User-visible name.
    pub name: String,
    /// The construction step and its parameters.
    pub operation: Operation,
    /// Memoized body geometry right after this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_mesh: Option<Mesh>,
    /// Body geometry right before this step. Only cut steps carry it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_mesh: Option<Mesh>,
}

impl Feature {
    pub fn new(name: impl Into<String>, operation: Operation) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            operation,
            cached_mesh: None,
            base_mesh: None,
        }
    }

    /// The sketch feature this step consumes, if any.
    pub fn sketch_ref(&self) -> Option<FeatureId> {
        self.operation.sketch_id()
    }

    pub fn is_cut(&self) -> bool {
        self.operation.is_cut()
    }

    pub fn is_sketch(&self) -> bool {
        matches!(self.operation, Operation::Sketch { .. })
    }

    /// A cut step that has never had its result memoized.
    pub fn needs_rebuild(&self) -> bool {
        self.is_cut() && self.cached_mesh.is_none()
    }

    /// Store a computed result. The pre-step snapshot is kept only for cuts.
    pub fn commit_cache(&mut self, cached: Mesh, base: Option<Mesh>) {
        self.cached_mesh = Some(cached);
        self.base_mesh = if self.is_cut() { base } else { None };
    }

    /// Drop memoized geometry. Returns true if anything was cached.
    pub fn invalidate(&mut self) -> bool {
        let had = self.cached_mesh.is_some() || self.base_mesh.is_some();
        self.cached_mesh = None;
        self.base_mesh = None;
        had
    }
}

/// A construction step with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    BasePrimitive {
        primitive: Primitive,
        #[serde(default)]
        transform: Transform,
    },
    Sketch {
        sketch: Sketch,
        #[serde(default)]
        transform: Transform,
    },
    Extrude {
        params: ExtrudeParams,
    },
    Revolve {
        params: RevolveParams,
    },
    BooleanModify {
        params: BooleanModifyParams,
    },
    #[serde(rename = "fillet_3d")]
    Fillet3d {
        params: FilletParams,
    },
    #[serde(rename = "chamfer_3d")]
    Chamfer3d {
        params: ChamferParams,
    },
}

impl Operation {
    pub fn sketch_id(&self) -> Option<FeatureId> {
        match self {
            Operation::Extrude { params } => Some(params.sketch_id),
            Operation::Revolve { params } => Some(params.sketch_id),
            _ => None,
        }
    }

    pub fn is_cut(&self) -> bool {
        match self {
            Operation::Extrude { params } => params.cut,
            Operation::Revolve { params } => params.cut,
            _ => false,
        }
    }

    /// The other body this step reads geometry from.
    pub fn tool_body(&self) -> Option<BodyId> {
        match self {
            Operation::BooleanModify { params } => Some(params.tool_body_id),
            _ => None,
        }
    }

    /// Display label in the feature tree.
    pub fn label(&self) -> String {
        match self {
            Operation::BasePrimitive { primitive, .. } => format!("Base {}", primitive.label()),
            Operation::Sketch { .. } => "Sketch".to_string(),
            Operation::Extrude { params } if params.cut => "Cut Extrude".to_string(),
            Operation::Extrude { .. } => "Boss Extrude".to_string(),
            Operation::Revolve { params } if params.cut => "Cut Revolve".to_string(),
            Operation::Revolve { .. } => "Boss Revolve".to_string(),
            Operation::BooleanModify { params } => match params.op {
                BooleanOp::Union => "Add Body".to_string(),
                BooleanOp::Difference => "Subtract Body".to_string(),
                BooleanOp::Intersection => "Intersect Body".to_string(),
            },
            Operation::Fillet3d { .. } => "Fillet".to_string(),
            Operation::Chamfer3d { .. } => "Chamfer".to_string(),
        }
    }
}

/// Parameters for an extrude (boss or cut).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrudeParams {
    pub sketch_id: FeatureId,
    /// Distance along the sketch normal. Unset means "default": 1.0 for a
    /// boss, through-all for a cut.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default)]
    pub height_backward: f64,
    /// Degrees; positive widens, negative narrows.
    #[serde(default)]
    pub draft_angle: f64,
    #[serde(default)]
    pub cut: bool,
}

impl ExtrudeParams {
    pub fn boss(sketch_id: FeatureId, height: f64) -> Self {
        Self {
            sketch_id,
            height: Some(height),
            height_backward: 0.0,
            draft_angle: 0.0,
            cut: false,
        }
    }

    pub fn cut(sketch_id: FeatureId, depth: Option<f64>) -> Self {
        Self {
            sketch_id,
            height: depth,
            height_backward: 0.0,
            draft_angle: 0.0,
            cut: true,
        }
    }
}

/// Parameters for a revolve (boss or cut).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevolveParams {
    pub sketch_id: FeatureId,
    /// Degrees. Unset means a full turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    pub segments: u32,
    /// Axis as two points on the sketch plane; None revolves about the
    /// sketch's vertical axis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<[[f64; 2]; 2]>,
    #[serde(default)]
    pub cut: bool,
}

/// Parameters for combining this body with another body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanModifyParams {
    pub op: BooleanOp,
    pub tool_body_id: BodyId,
}

/// Parameters for a 3D fillet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilletParams {
    pub radius: f64,
    pub segments: u32,
    pub edges: Vec<EdgeDescriptor>,
}

/// Parameters for a 3D chamfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChamferParams {
    pub distance: f64,
    pub edges: Vec<EdgeDescriptor>,
}
