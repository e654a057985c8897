use std::time::Instant;

use anvil_types::{ChamferParams, Mesh};
use kernel_bridge::GeometryKernel;

use crate::types::{elapsed_ms, Diagnostics, OpError, OpResult};

/// Bevel the selected edges of a body mesh.
pub fn execute_chamfer(
    kernel: &mut dyn GeometryKernel,
    mesh: &Mesh,
    params: &ChamferParams,
) -> Result<OpResult, OpError> {
    if params.distance <= 0.0 {
        return Err(OpError::InvalidParameter {
            reason: "chamfer distance must be positive".to_string(),
        });
    }
    if params.edges.is_empty() {
        return Err(OpError::InvalidParameter {
            reason: "chamfer needs at least one edge".to_string(),
        });
    }

    let start = Instant::now();
    let result = kernel.chamfer_edges(mesh, &params.edges, params.distance)?;
    Ok(OpResult {
        mesh: result,
        diagnostics: Diagnostics {
            warnings: Vec::new(),
            kernel_time_ms: elapsed_ms(start),
        },
    })
}
