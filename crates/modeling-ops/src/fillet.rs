use std::time::Instant;

use anvil_types::{FilletParams, Mesh};
use kernel_bridge::GeometryKernel;

use crate::types::{elapsed_ms, Diagnostics, OpError, OpResult};

/// Round the selected edges of a body mesh.
pub fn execute_fillet(
    kernel: &mut dyn GeometryKernel,
    mesh: &Mesh,
    params: &FilletParams,
) -> Result<OpResult, OpError> {
    if params.radius <= 0.0 {
        return Err(OpError::InvalidParameter {
            reason: "fillet radius must be positive".to_string(),
        });
    }
    if params.edges.is_empty() {
        return Err(OpError::InvalidParameter {
            reason: "fillet needs at least one edge".to_string(),
        });
    }
    let segments = params.segments.max(1);

    let start = Instant::now();
    let result = kernel.fillet_edges(mesh, &params.edges, params.radius, segments)?;
    Ok(OpResult {
        mesh: result,
        diagnostics: Diagnostics {
            warnings: Vec::new(),
            kernel_time_ms: elapsed_ms(start),
        },
    })
}
