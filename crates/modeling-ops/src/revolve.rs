use std::time::Instant;

use anvil_types::{RevolveParams, Sketch, Transform};
use kernel_bridge::{GeometryKernel, RevolveRequest};

use crate::types::{elapsed_ms, Diagnostics, OpError, OpResult};

/// Translate revolve parameters into a kernel request. An unset angle is a
/// full turn.
pub fn build_revolve_request(
    sketch: &Sketch,
    transform: &Transform,
    params: &RevolveParams,
) -> Result<RevolveRequest, OpError> {
    let elements = sketch.profile_elements();
    if elements.is_empty() {
        return Err(OpError::NoProfiles);
    }
    let angle = params.angle.unwrap_or(360.0);
    if !(angle > 0.0 && angle <= 360.0) {
        return Err(OpError::InvalidParameter {
            reason: format!("revolve angle {angle} outside (0, 360]"),
        });
    }
    if params.segments < 3 {
        return Err(OpError::InvalidParameter {
            reason: format!("revolve needs at least 3 segments, got {}", params.segments),
        });
    }
    if let Some([a, b]) = params.axis {
        if a == b {
            return Err(OpError::InvalidParameter {
                reason: "revolve axis points coincide".to_string(),
            });
        }
    }

    Ok(RevolveRequest {
        elements,
        plane: sketch.plane,
        angle,
        segments: params.segments,
        plane_offset: sketch.offset,
        axis: params.axis,
        face_coord_system: sketch.face_coord_system.clone(),
        transform: transform.clone(),
    })
}

/// Revolve a sketch profile. For cuts the result is the tool body.
pub fn execute_revolve(
    kernel: &mut dyn GeometryKernel,
    sketch: &Sketch,
    transform: &Transform,
    params: &RevolveParams,
) -> Result<OpResult, OpError> {
    let request = build_revolve_request(sketch, transform, params)?;

    let start = Instant::now();
    let mesh = kernel.generate_revolve(&request)?;
    Ok(OpResult {
        mesh,
        diagnostics: Diagnostics {
            warnings: Vec::new(),
            kernel_time_ms: elapsed_ms(start),
        },
    })
}
