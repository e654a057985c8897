use anvil_types::{
    BooleanOp, EdgeDescriptor, Mesh, Point2D, Primitive, Sketch, SketchElement, Transform,
};

use crate::types::*;

/// Solid-modeling side of the geometry kernel.
///
/// Calls are synchronous and may fail on degenerate input. The kernel keeps
/// no state the engine relies on: every call takes and returns plain meshes.
pub trait GeometryKernel {
    /// Mesh a primitive shape placed by `transform`.
    fn generate_primitive(
        &mut self,
        primitive: &Primitive,
        transform: &Transform,
    ) -> Result<Mesh, KernelError>;

    /// Sweep a profile along its plane normal.
    fn generate_extrude(&mut self, request: &ExtrudeRequest) -> Result<Mesh, KernelError>;

    /// Spin a profile about an axis on its plane.
    fn generate_revolve(&mut self, request: &RevolveRequest) -> Result<Mesh, KernelError>;

    /// CSG combination of two meshes. For `Difference`, `b` is removed from `a`.
    fn boolean(&mut self, a: &Mesh, b: &Mesh, op: BooleanOp) -> Result<Mesh, KernelError>;

    /// Round the given edges of a mesh.
    fn fillet_edges(
        &mut self,
        mesh: &Mesh,
        edges: &[EdgeDescriptor],
        radius: f64,
        segments: u32,
    ) -> Result<Mesh, KernelError>;

    /// Bevel the given edges of a mesh.
    fn chamfer_edges(
        &mut self,
        mesh: &Mesh,
        edges: &[EdgeDescriptor],
        distance: f64,
    ) -> Result<Mesh, KernelError>;
}

/// 2D side of the geometry kernel.
///
/// Identity-loss contract: `solve_constraints` and `trim_element` return bare
/// element geometry with no identifiers. For a solve, `result[i]` corresponds
/// to `sketch.entries[i]`. A trim only describes the element at
/// `element_index`: it is removed, or replaced in place by one or more
/// pieces. Callers must re-attach ids right away with
/// [`crate::identity::rezip_exact`] or [`crate::identity::rezip_trim`].
pub trait SketchKernel {
    /// Solve the sketch constraints, returning moved geometry.
    fn solve_constraints(&mut self, sketch: &Sketch) -> Result<Vec<SketchElement>, KernelError>;

    /// Trim the element at `element_index` at the piece nearest `point`.
    fn trim_element(
        &mut self,
        sketch: &Sketch,
        element_index: usize,
        point: Point2D,
    ) -> Result<TrimResult, KernelError>;

    /// Snap candidates near the cursor, nearest first.
    fn query_snap_points(
        &mut self,
        sketch: &Sketch,
        cursor: Point2D,
        settings: &SnapSettings,
    ) -> Vec<SnapPoint>;

    /// Fit a circular arc through three points, in order.
    fn fit_arc_through_three_points(&mut self, p1: Point2D, p2: Point2D, p3: Point2D) -> ArcFit;
}
