//! Synthetic mesh construction for the mock kernel.
//!
//! Shapes are approximated by their bounding hexahedra: enough for the
//! engine to thread real buffers through a feature chain and for tests to
//! check placement, without any CSG.

use anvil_types::{FaceCoordSystem, Mesh, Point2D, Primitive, SketchPlane, Transform};

/// Orthonormal frame of a sketch in model space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneFrame {
    pub origin: [f64; 3],
    pub u: [f64; 3],
    pub v: [f64; 3],
    pub normal: [f64; 3],
}

impl PlaneFrame {
    pub fn new(
        plane: SketchPlane,
        offset: f64,
        face: Option<&FaceCoordSystem>,
        transform: &Transform,
    ) -> Self {
        let mut frame = match face {
            Some(face) => PlaneFrame {
                origin: face.origin,
                u: face.u_axis,
                v: face.v_axis,
                normal: face.normal,
            },
            None => {
                let normal = plane.normal();
                let (u, v) = plane.axes();
                PlaneFrame {
                    origin: scale(normal, offset),
                    u,
                    v,
                    normal,
                }
            }
        };
        frame.origin = add(frame.origin, transform.position);
        frame
    }

    /// Model-space point of sketch coordinates (x, y) lifted by `z` along
    /// the normal.
    pub fn point(&self, x: f64, y: f64, z: f64) -> [f32; 3] {
        let p = add(
            add(self.origin, scale(self.u, x)),
            add(scale(self.v, y), scale(self.normal, z)),
        );
        [p[0] as f32, p[1] as f32, p[2] as f32]
    }
}

/// Bounding box of a primitive, centered on the transform position.
/// Rotation is not applied.
pub fn primitive_mesh(primitive: &Primitive, transform: &Transform) -> Mesh {
    let extents = primitive.extents();
    let mut min = [0.0f32; 3];
    let mut max = [0.0f32; 3];
    for axis in 0..3 {
        let half = extents[axis] * transform.scale[axis] / 2.0;
        min[axis] = (transform.position[axis] - half) as f32;
        max[axis] = (transform.position[axis] + half) as f32;
    }
    Mesh::cuboid(min, max)
}

/// Prism over the rectangle `min..max` of a sketch frame, spanning
/// `-backward..forward` along the frame normal.
pub fn profile_prism(
    frame: &PlaneFrame,
    min: Point2D,
    max: Point2D,
    backward: f64,
    forward: f64,
) -> Mesh {
    // Keep the bottom face wound clockwise seen from +normal, whatever the
    // handedness of (u, v, normal).
    let ring = if dot(cross(frame.u, frame.v), frame.normal) >= 0.0 {
        [(min.x, min.y), (max.x, min.y), (max.x, max.y), (min.x, max.y)]
    } else {
        [(min.x, min.y), (min.x, max.y), (max.x, max.y), (max.x, min.y)]
    };
    let mut corners = [[0.0f32; 3]; 8];
    for (i, (x, y)) in ring.iter().enumerate() {
        corners[i] = frame.point(*x, *y, -backward);
        corners[i + 4] = frame.point(*x, *y, forward);
    }
    Mesh::hexahedron(corners)
}

fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn scale(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_is_centered_on_position() {
        let mesh = primitive_mesh(&Primitive::unit_cube(), &Transform::translation(0.5, 0.0, 0.0));
        assert_eq!(mesh.bounds(), Some(([0.0, -0.5, -0.5], [1.0, 0.5, 0.5])));
    }

    #[test]
    fn xz_prism_extends_along_y() {
        let frame = PlaneFrame::new(SketchPlane::Xz, 2.0, None, &Transform::identity());
        let mesh = profile_prism(&frame, Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0), 0.0, 3.0);
        assert_eq!(mesh.bounds(), Some(([0.0, 2.0, 0.0], [1.0, 5.0, 1.0])));
    }

    #[test]
    fn prism_bottom_normal_opposes_frame_normal() {
        for plane in [SketchPlane::Xy, SketchPlane::Xz, SketchPlane::Yz] {
            let frame = PlaneFrame::new(plane, 0.0, None, &Transform::identity());
            let mesh =
                profile_prism(&frame, Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0), 0.0, 1.0);
            let n = &mesh.normals[0..3];
            let d = n[0] as f64 * frame.normal[0]
                + n[1] as f64 * frame.normal[1]
                + n[2] as f64 * frame.normal[2];
            assert!(d < -0.99, "{plane:?}: bottom normal {n:?}");
        }
    }
}
