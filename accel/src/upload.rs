//! Fills the library's native vertex/index/tangent buffers from mesh data,
//! including motion-blur time steps.
//!
//! The middle time step (`steps / 2`) always carries the rest positions; the
//! motion attribute stores the remaining steps, so one attribute step is
//! skipped when indexing past the middle. A failed buffer mapping is logged
//! with the mesh name and leaves the geometry empty instead of aborting the
//! build.

use glam::*;
use log::error;

use crate::backend::Geometry;
use iris_scene::Mesh;

/// Clamps a mesh's requested motion steps to what the library supports.
/// Requesting more than the maximum degrades to the maximum without error.
pub fn clamped_motion_steps(
    requested: usize,
    has_attribute: bool,
    max_steps: usize,
    use_motion_blur: bool,
) -> usize {
    if !use_motion_blur || !has_attribute || requested <= 1 {
        return 1;
    }
    requested.min(max_steps)
}

pub fn triangle_verts(mesh: &Mesh, tri: usize) -> [[f32; 4]; 3] {
    let idx = mesh.triangles[tri];
    let vert = |k: u32| -> [f32; 4] {
        let v = mesh.verts[k as usize];
        [v.x(), v.y(), v.z(), 0.0]
    };
    [vert(idx[0]), vert(idx[1]), vert(idx[2])]
}

pub fn set_tri_index_buffer(geom: &mut dyn Geometry, mesh: &Mesh) -> bool {
    let num_triangles = mesh.num_triangles();
    let buffer = match geom.map_indices(num_triangles, 3) {
        Some(buffer) => buffer,
        None => {
            error!("failed to create index buffer for mesh {}", mesh.name);
            return false;
        }
    };
    for (i, tri) in mesh.triangles.iter().enumerate() {
        buffer[i * 3] = tri[0];
        buffer[i * 3 + 1] = tri[1];
        buffer[i * 3 + 2] = tri[2];
    }
    true
}

pub fn set_tri_vertex_buffer(geom: &mut dyn Geometry, mesh: &Mesh, num_steps: usize) -> bool {
    let num_verts = mesh.verts.len();
    let t_mid = num_steps / 2;
    for t in 0..num_steps {
        let buffer = match geom.map_vertices(t, num_verts) {
            Some(buffer) => buffer,
            None => {
                error!("failed to create vertex buffer for mesh {}", mesh.name);
                return false;
            }
        };
        if t == t_mid {
            for (j, v) in mesh.verts.iter().enumerate() {
                buffer[j] = [v.x(), v.y(), v.z(), 0.0];
            }
        } else {
            let t_ = if t > t_mid { t - 1 } else { t };
            let offset = t_ * num_verts;
            for j in 0..num_verts {
                let v = mesh.motion_verts[offset + j];
                buffer[j] = [v.x(), v.y(), v.z(), 0.0];
            }
        }
    }
    true
}

pub fn set_curve_index_buffer(geom: &mut dyn Geometry, mesh: &Mesh) -> bool {
    let num_segments = mesh.num_segments();
    let buffer = match geom.map_indices(num_segments, 1) {
        Some(buffer) => buffer,
        None => {
            error!("failed to create index buffer for mesh {}", mesh.name);
            return false;
        }
    };
    let mut write = 0;
    for curve in mesh.curves.iter() {
        for segment in 0..curve.num_segments() {
            buffer[write] = curve.first_key + segment;
            write += 1;
        }
    }
    true
}

/// `(position, radius)` of one key at one time step.
fn curve_key_at(mesh: &Mesh, t: usize, t_mid: usize, key: usize) -> Vec4 {
    if t == t_mid {
        let p = mesh.curve_keys[key];
        Vec4::new(p.x(), p.y(), p.z(), mesh.curve_radius[key])
    } else {
        let t_ = if t > t_mid { t - 1 } else { t };
        mesh.motion_keys[t_ * mesh.num_keys() + key]
    }
}

pub fn set_curve_vertex_buffer(geom: &mut dyn Geometry, mesh: &Mesh, num_steps: usize) -> bool {
    let num_keys = mesh.num_keys();
    let t_mid = num_steps / 2;
    for t in 0..num_steps {
        let buffer = match geom.map_vertices(t, num_keys) {
            Some(buffer) => buffer,
            None => {
                error!("failed to create vertex buffer for mesh {}", mesh.name);
                return false;
            }
        };
        for j in 0..num_keys {
            buffer[j] = curve_key_at(mesh, t, t_mid, j).into();
        }
    }
    true
}

/// Hermite tangents with the radius delta in `w`: one-sided differences at
/// the curve ends, `0.5 * (next - prev)` at interior keys.
pub fn set_curve_tangent_buffer(geom: &mut dyn Geometry, mesh: &Mesh, num_steps: usize) -> bool {
    let num_keys = mesh.num_keys();
    let t_mid = num_steps / 2;
    for t in 0..num_steps {
        let buffer = match geom.map_tangents(t, num_keys) {
            Some(buffer) => buffer,
            None => {
                error!("failed to create tangent buffer for mesh {}", mesh.name);
                return false;
            }
        };
        for curve in mesh.curves.iter() {
            let first = curve.first_key as usize;
            let n = curve.num_keys as usize;
            for j in 0..n {
                let k = first + j;
                let tangent = if n == 1 {
                    Vec4::zero()
                } else if j == 0 {
                    curve_key_at(mesh, t, t_mid, k + 1) - curve_key_at(mesh, t, t_mid, k)
                } else if j == n - 1 {
                    curve_key_at(mesh, t, t_mid, k) - curve_key_at(mesh, t, t_mid, k - 1)
                } else {
                    (curve_key_at(mesh, t, t_mid, k + 1) - curve_key_at(mesh, t, t_mid, k - 1))
                        * 0.5
                };
                buffer[k] = tangent.into();
            }
        }
    }
    true
}
