use anvil_types::Mesh;
use serde::{Deserialize, Serialize};

/// Result of a modeling operation: the produced mesh plus diagnostics.
#[derive(Debug, Clone)]
pub struct OpResult {
    pub mesh: Mesh,
    /// Non-fatal warnings and timing information.
    pub diagnostics: Diagnostics,
}

/// Non-fatal diagnostics from an operation.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// Warning messages.
    pub warnings: Vec<String>,
    /// Time taken for the kernel call, in milliseconds.
    pub kernel_time_ms: f64,
}

/// How cut tools are built from a sketch.
///
/// A cut is swept from the sketch plane into the body. The tool starts
/// `clearance` in front of the plane so coplanar faces are removed cleanly,
/// and an unset depth cuts `through_distance` deep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutSettings {
    pub through_distance: f64,
    pub clearance: f64,
}

impl Default for CutSettings {
    fn default() -> Self {
        Self {
            through_distance: 1000.0,
            clearance: 0.01,
        }
    }
}

/// Errors from modeling operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OpError {
    #[error(transparent)]
    Kernel(#[from] kernel_bridge::KernelError),

    #[error("no profiles available for operation")]
    NoProfiles,

    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },
}

pub(crate) fn elapsed_ms(start: std::time::Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
