use std::time::Instant;

use anvil_types::{BooleanOp, Mesh};
use kernel_bridge::GeometryKernel;

use crate::types::{elapsed_ms, Diagnostics, OpError, OpResult};

/// Combine two meshes. For `Difference`, `tool` is removed from `target`.
pub fn execute_boolean(
    kernel: &mut dyn GeometryKernel,
    target: &Mesh,
    tool: &Mesh,
    op: BooleanOp,
) -> Result<OpResult, OpError> {
    let start = Instant::now();
    let mesh = kernel.boolean(target, tool, op)?;

    let mut warnings = Vec::new();
    if mesh.is_empty() {
        warnings.push(format!("{op:?} produced an empty mesh"));
    }
    Ok(OpResult {
        mesh,
        diagnostics: Diagnostics {
            warnings,
            kernel_time_ms: elapsed_ms(start),
        },
    })
}

/// Subtract a cut tool from the body it was swept into.
pub fn execute_cut(
    kernel: &mut dyn GeometryKernel,
    base: &Mesh,
    tool: &Mesh,
) -> Result<OpResult, OpError> {
    execute_boolean(kernel, base, tool, BooleanOp::Difference)
}
