use anvil_types::{FaceCoordSystem, Point2D, SketchElement, SketchPlane, Transform};
use serde::{Deserialize, Serialize};

/// Everything the kernel needs to sweep a profile along its plane normal.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtrudeRequest {
    pub elements: Vec<SketchElement>,
    pub plane: SketchPlane,
    /// Distance along the plane normal.
    pub height: f64,
    /// Distance against the plane normal.
    pub height_backward: f64,
    pub plane_offset: f64,
    /// Degrees.
    pub draft_angle: f64,
    /// Overrides `plane`/`plane_offset` for sketches on model faces.
    pub face_coord_system: Option<FaceCoordSystem>,
    /// Placement of the sketch.
    pub transform: Transform,
}

/// Everything the kernel needs to spin a profile about an axis.
#[derive(Debug, Clone, PartialEq)]
pub struct RevolveRequest {
    pub elements: Vec<SketchElement>,
    pub plane: SketchPlane,
    /// Degrees.
    pub angle: f64,
    pub segments: u32,
    pub plane_offset: f64,
    pub axis: Option<[[f64; 2]; 2]>,
    pub face_coord_system: Option<FaceCoordSystem>,
    pub transform: Transform,
}

/// Which snap targets the kernel should report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapSettings {
    /// Search radius around the cursor, in sketch units.
    pub radius: f64,
    pub endpoints: bool,
    pub midpoints: bool,
    pub centers: bool,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            radius: 0.25,
            endpoints: true,
            midpoints: true,
            centers: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapType {
    Endpoint,
    Midpoint,
    Center,
}

/// A snap candidate. `source_element` is a position in the queried
/// sketch's entry list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapPoint {
    pub point: Point2D,
    pub snap_type: SnapType,
    pub source_element: Option<usize>,
}

/// Circle fitted through three points. `valid` is false for collinear input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcFit {
    pub valid: bool,
    pub center: Point2D,
    pub radius: f64,
    /// Radians.
    pub start_angle: f64,
    /// Radians.
    pub end_angle: f64,
}

/// What a trim did to the element at the trimmed position. Every other
/// entry of the sketch is left as it was.
#[derive(Debug, Clone, PartialEq)]
pub enum TrimResult {
    /// The element is deleted.
    Removed,
    /// The element is replaced by these pieces, in order, at its position.
    Replaced(Vec<SketchElement>),
    /// Nothing to cut at that point.
    NoChange,
}

/// Kernel call kinds, used for call accounting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelCall {
    Primitive,
    Extrude,
    Revolve,
    Boolean,
    Fillet,
    Chamfer,
    Solve,
    Trim,
    Snap,
    FitArc,
}

/// Errors crossing the kernel boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KernelError {
    #[error("boolean operation failed: {reason}")]
    BooleanFailed { reason: String },

    #[error("profile generation failed: {reason}")]
    ProfileFailed { reason: String },

    #[error("fillet failed: {reason}")]
    FilletFailed { reason: String },

    #[error("constraint solver did not converge: {reason}")]
    SolveFailed { reason: String },

    #[error("kernel response has {got} elements, request had {expected}")]
    MisalignedResponse { expected: usize, got: usize },

    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },

    #[error("kernel error: {message}")]
    Other { message: String },
}
