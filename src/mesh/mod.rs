/// Mesh buffer views and demo primitives.
///
/// The engine does not own geometry: the scene layer hands it flat vertex
/// and index buffers each frame. `MeshBuffers` is that read-only borrowed
/// pair; `MeshData` is an owned convenience used by the demo viewer and
/// the tests.
use std::f32::consts::PI;

/// Borrowed view over externally owned geometry.
/// Positions are 3 floats per vertex; indices come in triples, one per
/// triangle, counter-clockwise winding facing out.
#[derive(Copy, Clone)]
pub struct MeshBuffers<'a> {
    pub positions: &'a [f32],
    pub indices: &'a [u32],
}

impl<'a> MeshBuffers<'a> {
    pub fn new(positions: &'a [f32], indices: &'a [u32]) -> Self {
        Self { positions, indices }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Owned geometry, convertible to a `MeshBuffers` view.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn buffers(&self) -> MeshBuffers<'_> {
        MeshBuffers::new(&self.positions, &self.indices)
    }
}

/// Unit cube centered at the origin: 8 vertices, 12 triangles.
pub fn cube() -> MeshData {
    let positions = vec![
        -0.5, -0.5, -0.5, // 0
        0.5, -0.5, -0.5, // 1
        0.5, 0.5, -0.5, // 2
        -0.5, 0.5, -0.5, // 3
        -0.5, -0.5, 0.5, // 4
        0.5, -0.5, 0.5, // 5
        0.5, 0.5, 0.5, // 6
        -0.5, 0.5, 0.5, // 7
    ];
    let indices = vec![
        4, 5, 6, 4, 6, 7, // +Z
        1, 0, 3, 1, 3, 2, // -Z
        5, 1, 2, 5, 2, 6, // +X
        0, 4, 7, 0, 7, 3, // -X
        7, 6, 2, 7, 2, 3, // +Y
        0, 1, 5, 0, 5, 4, // -Y
    ];
    MeshData { positions, indices }
}

/// UV sphere of the given radius.
pub fn uv_sphere(radius: f32, rings: usize, segments: usize) -> MeshData {
    let rings = rings.max(3);
    let segments = segments.max(3);
    let mut mesh = MeshData::default();

    for r in 0..=rings {
        let theta = PI * r as f32 / rings as f32;
        let (sin_t, cos_t) = theta.sin_cos();
        for s in 0..=segments {
            let phi = 2.0 * PI * s as f32 / segments as f32;
            let (sin_p, cos_p) = phi.sin_cos();
            mesh.positions.push(radius * sin_t * cos_p);
            mesh.positions.push(radius * cos_t);
            mesh.positions.push(radius * sin_t * sin_p);
        }
    }

    let stride = (segments + 1) as u32;
    for r in 0..rings as u32 {
        for s in 0..segments as u32 {
            let a = r * stride + s;
            let b = a + stride;
            mesh.indices.extend_from_slice(&[a, a + 1, b + 1]);
            mesh.indices.extend_from_slice(&[a, b + 1, b]);
        }
    }
    mesh
}

/// Torus in the XZ plane: `ring_radius` to the tube center, `tube_radius`
/// around it.
pub fn torus(ring_radius: f32, tube_radius: f32, rings: usize, sides: usize) -> MeshData {
    let rings = rings.max(3);
    let sides = sides.max(3);
    let mut mesh = MeshData::default();

    for r in 0..=rings {
        let u = 2.0 * PI * r as f32 / rings as f32;
        let (sin_u, cos_u) = u.sin_cos();
        for s in 0..=sides {
            let v = 2.0 * PI * s as f32 / sides as f32;
            let (sin_v, cos_v) = v.sin_cos();
            let radial = ring_radius + tube_radius * cos_v;
            mesh.positions.push(radial * cos_u);
            mesh.positions.push(tube_radius * sin_v);
            mesh.positions.push(radial * sin_u);
        }
    }

    let stride = (sides + 1) as u32;
    for r in 0..rings as u32 {
        for s in 0..sides as u32 {
            let a = r * stride + s;
            let b = a + stride;
            mesh.indices.extend_from_slice(&[a, a + 1, b + 1]);
            mesh.indices.extend_from_slice(&[a, b + 1, b]);
        }
    }
    mesh
}
