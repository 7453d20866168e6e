//! Mesh generators for common shapes.

use super::data::Mesh;
use crate::uuid::Uuid;

/// Generate a quad in the XY plane, facing +Z.
pub fn generate_quad(id: Uuid, half_width: f32, half_height: f32) -> Mesh {
    #[rustfmt::skip]
    let positions = vec![
        -half_width, -half_height, 0.0,
         half_width, -half_height, 0.0,
         half_width,  half_height, 0.0,
        -half_width,  half_height, 0.0,
    ];
    let normals = [0.0, 0.0, 1.0].repeat(4);
    let texcoords = vec![0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0];

    Mesh::new(id)
        .with_positions(positions)
        .with_normals(normals)
        .with_texcoords(texcoords)
        .with_indices(vec![0, 1, 2, 2, 3, 0])
        .with_label("quad")
}

/// Generate an axis-aligned cube centered at the origin.
///
/// Each face has its own four vertices so normals stay flat.
pub fn generate_cube(id: Uuid, half_extent: f32) -> Mesh {
    let h = half_extent;
    // (normal, u axis, v axis) per face
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];

    let mut positions = Vec::with_capacity(6 * 4 * 3);
    let mut normals = Vec::with_capacity(6 * 4 * 3);
    let mut texcoords = Vec::with_capacity(6 * 4 * 2);
    let mut indices = Vec::with_capacity(36);

    for (face, (n, u, v)) in faces.iter().enumerate() {
        let base = (face * 4) as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            for axis in 0..3 {
                positions.push((n[axis] + su * u[axis] + sv * v[axis]) * h);
            }
            normals.extend_from_slice(n);
            texcoords.extend_from_slice(&[(su + 1.0) * 0.5, (1.0 - sv) * 0.5]);
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    Mesh::new(id)
        .with_positions(positions)
        .with_normals(normals)
        .with_texcoords(texcoords)
        .with_indices(indices)
        .with_label("cube")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_quad() {
        let mesh = generate_quad(Uuid::NIL, 0.5, 0.5);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.index_count(), 6);
        assert_eq!(mesh.texcoords.len(), 8);
    }

    #[test]
    fn test_generate_cube() {
        let mesh = generate_cube(Uuid::NIL, 1.0);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.index_count(), 36);
        for p in mesh.positions.chunks_exact(3) {
            assert!(p.iter().all(|c| (c.abs() - 1.0).abs() < 1e-6));
        }
    }
}
