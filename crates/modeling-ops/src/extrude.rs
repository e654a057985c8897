use std::time::Instant;

use anvil_types::{ExtrudeParams, Sketch, Transform};
use kernel_bridge::{ExtrudeRequest, GeometryKernel};

use crate::types::{elapsed_ms, CutSettings, Diagnostics, OpError, OpResult};

/// Boss height used when the feature leaves it unset.
pub const DEFAULT_BOSS_HEIGHT: f64 = 1.0;

/// Translate extrude parameters into a kernel request.
///
/// A boss sweeps `height` along the plane normal and `height_backward`
/// against it. A cut becomes a tool swept into the body: `depth` (or the
/// through distance) against the normal, plus `cut.clearance` on both ends.
pub fn build_extrude_request(
    sketch: &Sketch,
    transform: &Transform,
    params: &ExtrudeParams,
    cut: &CutSettings,
) -> Result<ExtrudeRequest, OpError> {
    let elements = sketch.profile_elements();
    if elements.is_empty() {
        return Err(OpError::NoProfiles);
    }
    if params.height_backward < 0.0 {
        return Err(OpError::InvalidParameter {
            reason: "backward height must not be negative".to_string(),
        });
    }

    let (height, height_backward) = if params.cut {
        let depth = params.height.unwrap_or(cut.through_distance);
        if depth <= 0.0 {
            return Err(OpError::InvalidParameter {
                reason: "cut depth must be positive".to_string(),
            });
        }
        (
            cut.clearance + params.height_backward,
            depth + cut.clearance,
        )
    } else {
        let height = params.height.unwrap_or(DEFAULT_BOSS_HEIGHT);
        if height < 0.0 || height + params.height_backward <= 0.0 {
            return Err(OpError::InvalidParameter {
                reason: "extrude height must be positive".to_string(),
            });
        }
        (height, params.height_backward)
    };

    Ok(ExtrudeRequest {
        elements,
        plane: sketch.plane,
        height,
        height_backward,
        plane_offset: sketch.offset,
        draft_angle: params.draft_angle,
        face_coord_system: sketch.face_coord_system.clone(),
        transform: transform.clone(),
    })
}

/// Extrude a sketch profile. For cuts the result is the tool body, to be
/// subtracted with [`crate::boolean::execute_cut`].
pub fn execute_extrude(
    kernel: &mut dyn GeometryKernel,
    sketch: &Sketch,
    transform: &Transform,
    params: &ExtrudeParams,
    cut: &CutSettings,
) -> Result<OpResult, OpError> {
    let request = build_extrude_request(sketch, transform, params, cut)?;

    let mut warnings = Vec::new();
    let skipped = sketch.entries.len() - request.elements.len();
    if skipped > 0 {
        warnings.push(format!("{skipped} construction elements left out of the profile"));
    }
    if params.draft_angle.abs() >= 90.0 {
        warnings.push(format!("draft angle {} is out of range", params.draft_angle));
    }

    let start = Instant::now();
    let mesh = kernel.generate_extrude(&request)?;
    Ok(OpResult {
        mesh,
        diagnostics: Diagnostics {
            warnings,
            kernel_time_ms: elapsed_ms(start),
        },
    })
}
