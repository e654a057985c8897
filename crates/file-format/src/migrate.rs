//! Upgrades of older project files to the current scene model.
//!
//! Version 1 files hold a flat list of scene operations with string ids.
//! Version 2 files hold bodies with feature lists, plus the boolean
//! operations between bodies.

use std::collections::HashMap;

use anvil_types::{
    Body, BodyId, BodyOperation, BooleanModifyParams, BooleanOp, BooleanResult, ExtrudeParams,
    Feature, Operation, Primitive, RevolveParams, SceneDescription, Sketch, SketchElement,
    SketchPlane, Transform,
};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::LoadError;
use crate::metadata::ProjectMetadata;
use crate::save::FORMAT_VERSION;

#[derive(Debug, Deserialize)]
struct CurrentFile {
    project: ProjectMetadata,
    scene: SceneDescription,
}

#[derive(Debug, Deserialize)]
struct V1File {
    #[serde(default)]
    project: Option<ProjectMetadata>,
    #[serde(default)]
    operations: Vec<V1Operation>,
}

#[derive(Debug, Clone, Deserialize)]
struct V1Sketch {
    plane: SketchPlane,
    #[serde(default)]
    offset: f64,
    #[serde(default)]
    elements: Vec<SketchElement>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum V1Operation {
    CreatePrimitive {
        id: String,
        primitive: Primitive,
        transform: Transform,
    },
    Boolean {
        id: String,
        op: BooleanOp,
        left: String,
        right: String,
    },
    CreateSketch {
        id: String,
        sketch: V1Sketch,
        transform: Transform,
    },
    Extrude {
        id: String,
        sketch_id: String,
        height: f64,
    },
    Revolve {
        id: String,
        sketch_id: String,
        angle: f64,
        segments: u32,
    },
    Cut {
        id: String,
        sketch_id: String,
        target_id: String,
        depth: f64,
    },
}

/// Parse the payload of a file written at `from_version` into the current
/// model.
pub fn migrate(
    document: serde_json::Value,
    from_version: u32,
) -> Result<(SceneDescription, ProjectMetadata), LoadError> {
    match from_version {
        FORMAT_VERSION => {
            let file: CurrentFile = serde_json::from_value(document)
                .map_err(|e| LoadError::ParseError(e.to_string()))?;
            Ok((file.scene, file.project))
        }
        1 => {
            let file: V1File =
                serde_json::from_value(document).map_err(|e| LoadError::MigrationFailed {
                    from: 1,
                    to: FORMAT_VERSION,
                    reason: e.to_string(),
                })?;
            let scene = migrate_v1_to_v2(&file.operations);
            Ok((scene, file.project.unwrap_or_default()))
        }
        _ => Err(LoadError::MigrationFailed {
            from: from_version,
            to: FORMAT_VERSION,
            reason: format!("no migration path from v{} to v{}", from_version, FORMAT_VERSION),
        }),
    }
}

/// Replay a version 1 operation list into bodies.
///
/// Primitives, extrudes and revolves each start a body. A cut appends its
/// sketch and a cut extrude to the target body. A boolean creates a new body
/// combining both operands and hides them. Operations naming an unknown id
/// are dropped.
fn migrate_v1_to_v2(operations: &[V1Operation]) -> SceneDescription {
    let mut scene = SceneDescription::default();
    let mut bodies_by_id: HashMap<&str, BodyId> = HashMap::new();
    let mut sketches: HashMap<&str, (&V1Sketch, &Transform)> = HashMap::new();

    for operation in operations {
        match operation {
            V1Operation::CreatePrimitive {
                id,
                primitive,
                transform,
            } => {
                let mut body = Body::new(format!("Body {}", scene.bodies.len() + 1));
                body.features.push(Feature::new(
                    format!("Base {}", primitive.label()),
                    Operation::BasePrimitive {
                        primitive: primitive.clone(),
                        transform: transform.clone(),
                    },
                ));
                bodies_by_id.insert(id, body.id);
                scene.bodies.push(body);
            }

            V1Operation::CreateSketch {
                id,
                sketch,
                transform,
            } => {
                sketches.insert(id, (sketch, transform));
            }

            V1Operation::Extrude {
                id,
                sketch_id,
                height,
            } => {
                let Some(&(sketch, transform)) = sketches.get(sketch_id.as_str()) else {
                    warn!(operation = %id, sketch = %sketch_id, "dropping extrude of unknown sketch");
                    continue;
                };
                let mut body = Body::new(format!("Body {}", scene.bodies.len() + 1));
                let sketch_feature = sketch_feature(sketch, transform);
                let params = ExtrudeParams::boss(sketch_feature.id, *height);
                body.features.push(sketch_feature);
                body.features
                    .push(Feature::new("Extrude", Operation::Extrude { params }));
                bodies_by_id.insert(id, body.id);
                scene.bodies.push(body);
            }

            V1Operation::Revolve {
                id,
                sketch_id,
                angle,
                segments,
            } => {
                let Some(&(sketch, transform)) = sketches.get(sketch_id.as_str()) else {
                    warn!(operation = %id, sketch = %sketch_id, "dropping revolve of unknown sketch");
                    continue;
                };
                let mut body = Body::new(format!("Body {}", scene.bodies.len() + 1));
                let sketch_feature = sketch_feature(sketch, transform);
                let params = RevolveParams {
                    sketch_id: sketch_feature.id,
                    angle: Some(*angle),
                    segments: *segments,
                    axis: None,
                    cut: false,
                };
                body.features.push(sketch_feature);
                body.features
                    .push(Feature::new("Revolve", Operation::Revolve { params }));
                bodies_by_id.insert(id, body.id);
                scene.bodies.push(body);
            }

            V1Operation::Cut {
                id,
                sketch_id,
                target_id,
                depth,
            } => {
                let target = bodies_by_id.get(target_id.as_str()).copied();
                let sketch = sketches.get(sketch_id.as_str()).copied();
                let (Some(target), Some((sketch, transform))) = (target, sketch) else {
                    warn!(operation = %id, "dropping cut with unknown sketch or target");
                    continue;
                };
                if let Some(body) = scene.body_mut(target) {
                    let sketch_feature = sketch_feature(sketch, transform);
                    let params = ExtrudeParams::cut(sketch_feature.id, Some(*depth));
                    body.features.push(sketch_feature);
                    body.features
                        .push(Feature::new("Cut", Operation::Extrude { params }));
                }
                bodies_by_id.insert(id, target);
            }

            V1Operation::Boolean {
                id,
                op,
                left,
                right,
            } => {
                let left_body = bodies_by_id.get(left.as_str()).copied();
                let right_body = bodies_by_id.get(right.as_str()).copied();
                let (Some(left_body), Some(right_body)) = (left_body, right_body) else {
                    warn!(operation = %id, "dropping boolean with unknown operand");
                    continue;
                };
                let name = format!("Boolean {}", scene.body_operations.len() + 1);
                let mut body = Body::new(name.clone());
                body.features
                    .push(boolean_feature(BooleanOp::Union, left_body));
                body.features.push(boolean_feature(*op, right_body));
                for operand in scene
                    .bodies
                    .iter_mut()
                    .filter(|b| b.id == left_body || b.id == right_body)
                {
                    operand.visible = false;
                }
                scene.body_operations.push(BodyOperation {
                    id: Uuid::new_v4(),
                    op: *op,
                    left_body_id: left_body,
                    right_body_id: right_body,
                    result: BooleanResult::CreateNewBody {
                        new_body_id: body.id,
                        new_body_name: name,
                    },
                });
                bodies_by_id.insert(id, body.id);
                scene.bodies.push(body);
            }
        }
    }

    debug!(
        operations = operations.len(),
        bodies = scene.bodies.len(),
        "migrated version 1 scene"
    );
    scene
}

fn sketch_feature(sketch: &V1Sketch, transform: &Transform) -> Feature {
    let mut migrated = Sketch::new(sketch.plane, sketch.offset);
    for element in &sketch.elements {
        migrated.add_element(element.clone());
    }
    Feature::new(
        "Sketch",
        Operation::Sketch {
            sketch: migrated,
            transform: transform.clone(),
        },
    )
}

fn boolean_feature(op: BooleanOp, tool_body_id: BodyId) -> Feature {
    let name = match op {
        BooleanOp::Union => "Union",
        BooleanOp::Difference => "Subtract",
        BooleanOp::Intersection => "Intersect",
    };
    Feature::new(
        name,
        Operation::BooleanModify {
            params: BooleanModifyParams { op, tool_body_id },
        },
    )
}
