use std::time::Instant;

use anvil_types::{Primitive, Transform};
use kernel_bridge::GeometryKernel;

use crate::types::{elapsed_ms, Diagnostics, OpError, OpResult};

/// Mesh a base primitive.
pub fn execute_primitive(
    kernel: &mut dyn GeometryKernel,
    primitive: &Primitive,
    transform: &Transform,
) -> Result<OpResult, OpError> {
    if primitive.extents().iter().any(|e| !(*e > 0.0)) {
        return Err(OpError::InvalidParameter {
            reason: format!("{} dimensions must be positive", primitive.label()),
        });
    }
    if transform.scale.iter().any(|s| *s == 0.0) {
        return Err(OpError::InvalidParameter {
            reason: "zero scale".to_string(),
        });
    }

    let start = Instant::now();
    let mesh = kernel.generate_primitive(primitive, transform)?;
    Ok(OpResult {
        mesh,
        diagnostics: Diagnostics {
            warnings: Vec::new(),
            kernel_time_ms: elapsed_ms(start),
        },
    })
}
