use serde::{Deserialize, Serialize};

/// Shape kind and dimensions of a base primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Primitive {
    Cube { width: f64, height: f64, depth: f64 },
    Cylinder { radius: f64, height: f64 },
    Sphere { radius: f64 },
    Cone { radius: f64, height: f64 },
}

impl Primitive {
    /// Unit cube, the default shape for new bodies.
    pub fn unit_cube() -> Self {
        Primitive::Cube {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        }
    }

    /// Extent of the primitive along X, Y and Z before transformation.
    pub fn extents(&self) -> [f64; 3] {
        match *self {
            Primitive::Cube {
                width,
                height,
                depth,
            } => [width, height, depth],
            Primitive::Cylinder { radius, height } | Primitive::Cone { radius, height } => {
                [2.0 * radius, 2.0 * radius, height]
            }
            Primitive::Sphere { radius } => [2.0 * radius; 3],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Primitive::Cube { .. } => "Cube",
            Primitive::Cylinder { .. } => "Cylinder",
            Primitive::Sphere { .. } => "Sphere",
            Primitive::Cone { .. } => "Cone",
        }
    }
}

/// Rigid placement of a primitive or sketch, plus per-axis scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f64; 3],
    /// Euler angles in degrees.
    pub rotation: [f64; 3],
    pub scale: [f64; 3],
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }

    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: [x, y, z],
            ..Self::identity()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// CSG operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanOp {
    Union,
    Difference,
    Intersection,
}

/// A picked model edge, described geometrically so it survives
/// re-tessellation: its endpoints and the normals of the adjacent faces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDescriptor {
    pub start: [f64; 3],
    pub end: [f64; 3],
    pub normal_a: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_b: Option<[f64; 3]>,
}
