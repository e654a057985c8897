use serde::{Deserialize, Serialize};

/// Triangle mesh produced by the geometry kernel.
///
/// Buffers are flat so they can be handed to the renderer and persisted
/// as plain numeric arrays without conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Flat array of vertex positions [x0, y0, z0, x1, y1, z1, ...].
    pub vertices: Vec<f32>,
    /// Flat array of vertex normals [nx0, ny0, nz0, ...].
    pub normals: Vec<f32>,
    /// Triangle indices into the vertex array.
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(vertices: Vec<f32>, normals: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            normals,
            indices,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Build a closed hexahedron from its eight corners.
    ///
    /// Corner order: bottom face counter-clockwise (0..4), then the top face
    /// in the same order (4..8). Each face gets its own four vertices so
    /// normals stay flat.
    pub fn hexahedron(corners: [[f32; 3]; 8]) -> Self {
        const FACES: [[usize; 4]; 6] = [
            [0, 3, 2, 1], // bottom
            [4, 5, 6, 7], // top
            [0, 1, 5, 4], // front
            [1, 2, 6, 5], // right
            [2, 3, 7, 6], // back
            [3, 0, 4, 7], // left
        ];

        let mut mesh = Mesh::default();
        for face in FACES {
            let [a, b, c, d] = face.map(|i| corners[i]);
            let normal = face_normal(a, b, c);
            let base = mesh.vertex_count() as u32;
            for p in [a, b, c, d] {
                mesh.vertices.extend_from_slice(&p);
                mesh.normals.extend_from_slice(&normal);
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    /// Axis-aligned box spanning `min..max`.
    pub fn cuboid(min: [f32; 3], max: [f32; 3]) -> Self {
        Self::hexahedron([
            [min[0], min[1], min[2]],
            [max[0], min[1], min[2]],
            [max[0], max[1], min[2]],
            [min[0], max[1], min[2]],
            [min[0], min[1], max[2]],
            [max[0], min[1], max[2]],
            [max[0], max[1], max[2]],
            [min[0], max[1], max[2]],
        ])
    }

    /// Box of edge length `size` centered on the origin.
    ///
    /// Displayed in place of a body whose evaluation failed.
    pub fn placeholder(size: f32) -> Self {
        let h = size / 2.0;
        Self::cuboid([-h, -h, -h], [h, h, h])
    }

    /// Concatenate two meshes into one, re-basing the second mesh's indices.
    pub fn merged(&self, other: &Mesh) -> Mesh {
        let base = self.vertex_count() as u32;
        let mut out = self.clone();
        out.vertices.extend_from_slice(&other.vertices);
        out.normals.extend_from_slice(&other.normals);
        out.indices.extend(other.indices.iter().map(|i| i + base));
        out
    }

    /// Copy of this mesh with every triangle's winding and normal flipped.
    pub fn inverted(&self) -> Mesh {
        let mut out = self.clone();
        for tri in out.indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
        for n in &mut out.normals {
            *n = -*n;
        }
        out
    }

    /// Axis-aligned bounds as (min, max), or None for a mesh without vertices.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let mut points = self.vertices.chunks_exact(3);
        let first = points.next()?;
        let mut min = [first[0], first[1], first[2]];
        let mut max = min;
        for p in points {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        Some((min, max))
    }
}

fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len < 1e-12 {
        return [0.0, 0.0, 1.0];
    }
    [n[0] / len, n[1] / len, n[2] / len]
}
