//! Mesh generators for common shapes.
//!
//! Both shapes split vertices along hard edges or texture seams the way
//! exported assets do, so they contain bit-identical duplicate positions
//! for the smoother to merge.

use std::f32::consts::PI;

use crate::math::Vec3;

use super::data::CpuMesh;

/// Generate a UV sphere mesh.
///
/// Creates a sphere with the given radius, number of longitudinal segments,
/// and number of latitudinal rings, with u32 triangle-list indices.
///
/// The seam column (`segment == segments`) repeats the first column's
/// positions exactly, and every vertex of the top and bottom ring sits on
/// the pole, so a `segments x rings` sphere has
/// `(rings - 1) * segments + 2` distinct positions.
///
/// # Arguments
///
/// * `radius` - Sphere radius
/// * `segments` - Number of longitudinal segments (around the equator)
/// * `rings` - Number of latitudinal rings (from pole to pole)
pub fn generate_sphere(radius: f32, segments: u32, rings: u32) -> CpuMesh {
    let segments = segments.max(3);
    let rings = rings.max(2);

    let vertex_count = ((rings + 1) * (segments + 1)) as usize;
    let mut positions = Vec::with_capacity(vertex_count);
    let mut normals = Vec::with_capacity(vertex_count);
    let mut indices = Vec::with_capacity((rings * segments * 6) as usize);

    for ring in 0..=rings {
        let (sin_theta, cos_theta) = if ring == 0 {
            (0.0, 1.0)
        } else if ring == rings {
            (0.0, -1.0)
        } else {
            let theta = ring as f32 * PI / rings as f32;
            (theta.sin(), theta.cos())
        };

        for segment in 0..=segments {
            // Wrap the seam column onto column 0 so its positions match bit for bit.
            let phi = (segment % segments) as f32 * 2.0 * PI / segments as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();

            let normal = Vec3::new(sin_theta * cos_phi, cos_theta, sin_theta * sin_phi);
            positions.push(normal * radius);
            normals.push(normal);
        }
    }

    for ring in 0..rings {
        for segment in 0..segments {
            let current = ring * (segments + 1) + segment;
            let next = current + segments + 1;

            indices.extend_from_slice(&[current, next, current + 1]);
            indices.extend_from_slice(&[current + 1, next, next + 1]);
        }
    }

    CpuMesh::new()
        .with_positions(positions)
        .with_normals(normals)
        .with_indices(indices)
        .with_label("sphere")
}

/// Generate a flat-shaded cube centered at the origin.
///
/// Each face has its own four vertices carrying the face normal, giving
/// 24 vertices over 8 distinct corner positions.
///
/// # Arguments
///
/// * `half_extent` - Half the edge length
pub fn generate_cube(half_extent: f32) -> CpuMesh {
    // (normal, u axis, v axis) per face, with u x v == normal.
    let faces = [
        (Vec3::x(), -Vec3::z(), Vec3::y()),
        (-Vec3::x(), Vec3::z(), Vec3::y()),
        (Vec3::y(), Vec3::x(), -Vec3::z()),
        (-Vec3::y(), Vec3::x(), Vec3::z()),
        (Vec3::z(), Vec3::x(), Vec3::y()),
        (-Vec3::z(), -Vec3::x(), Vec3::y()),
    ];

    let mut positions = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, u, v) in faces {
        let base = positions.len() as u32;
        for (su, sv) in [(-1.0f32, -1.0f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            positions.push((normal + u * su + v * sv) * half_extent);
            normals.push(normal);
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    CpuMesh::new()
        .with_positions(positions)
        .with_normals(normals)
        .with_indices(indices)
        .with_label("cube")
}
