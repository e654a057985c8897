//! Helper functions: error type, sketch and feature fixtures, mesh math.

use anvil_types::*;
use feature_engine::EngineError;
use file_format::{LoadError, SaveError};

// ── Error Type ──────────────────────────────────────────────────────────────

/// Unified error type for the test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("body not found: {name}")]
    BodyNotFound { name: String },

    #[error("feature not found: {name}")]
    FeatureNotFound { name: String },

    #[error("duplicate name: {name}")]
    DuplicateName { name: String },

    #[error("no mesh for body: {name}")]
    NoMesh { name: String },

    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("save error: {0}")]
    Save(#[from] SaveError),

    #[error("load error: {0}")]
    Load(#[from] LoadError),
}

// ── Sketch Fixtures ─────────────────────────────────────────────────────────

/// Sketch holding one rectangle with its corner at (x, y).
pub fn rect_sketch(plane: SketchPlane, offset: f64, x: f64, y: f64, w: f64, h: f64) -> Sketch {
    let mut sketch = Sketch::new(plane, offset);
    sketch.add_element(SketchElement::Rectangle {
        corner: Point2D::new(x, y),
        width: w,
        height: h,
    });
    sketch
}

/// Sketch holding one circle.
pub fn circle_sketch(plane: SketchPlane, offset: f64, cx: f64, cy: f64, r: f64) -> Sketch {
    let mut sketch = Sketch::new(plane, offset);
    sketch.add_element(SketchElement::Circle {
        center: Point2D::new(cx, cy),
        radius: r,
    });
    sketch
}

// ── Feature Fixtures ────────────────────────────────────────────────────────

pub fn cube_feature(size: f64, position: [f64; 3]) -> Feature {
    Feature::new(
        "Base Cube",
        Operation::BasePrimitive {
            primitive: Primitive::Cube {
                width: size,
                height: size,
                depth: size,
            },
            transform: Transform {
                position,
                ..Transform::identity()
            },
        },
    )
}

pub fn sketch_feature(name: &str, sketch: Sketch) -> Feature {
    Feature::new(
        name,
        Operation::Sketch {
            sketch,
            transform: Transform::identity(),
        },
    )
}

pub fn cut_feature(name: &str, sketch_id: FeatureId, depth: Option<f64>) -> Feature {
    Feature::new(
        name,
        Operation::Extrude {
            params: ExtrudeParams::cut(sketch_id, depth),
        },
    )
}

pub fn boss_feature(name: &str, sketch_id: FeatureId, height: f64) -> Feature {
    Feature::new(
        name,
        Operation::Extrude {
            params: ExtrudeParams::boss(sketch_id, height),
        },
    )
}

// ── Mesh Math ───────────────────────────────────────────────────────────────

/// Axis-aligned bounding box of a mesh. Empty meshes give a zero box.
pub fn mesh_bounding_box(mesh: &Mesh) -> ([f32; 3], [f32; 3]) {
    mesh.bounds().unwrap_or(([0.0; 3], [0.0; 3]))
}

/// Compute the signed volume of a triangle mesh using the divergence theorem.
///
/// For a closed mesh with outward winding this is the enclosed volume.
/// Shells with inward winding count negatively, so a body with a tool
/// subtracted from it measures the difference.
pub fn mesh_volume(mesh: &Mesh) -> f64 {
    let vertex = |i: u32| {
        let i = i as usize * 3;
        [
            mesh.vertices[i] as f64,
            mesh.vertices[i + 1] as f64,
            mesh.vertices[i + 2] as f64,
        ]
    };
    let mut volume = 0.0f64;
    for tri in mesh.indices.chunks_exact(3) {
        let (a, b, c) = (vertex(tri[0]), vertex(tri[1]), vertex(tri[2]));
        volume += a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
            + a[2] * (b[0] * c[1] - b[1] * c[0]);
    }
    volume / 6.0
}
