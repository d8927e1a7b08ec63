use glam::*;
use serde::{Deserialize, Serialize};

use crate::aabb::Aabb;
use crate::utils::Flags;

/// One hair/fiber curve: a run of consecutive keys in the mesh key arrays.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Curve {
    pub first_key: u32,
    pub num_keys: u32,
}

impl Curve {
    pub fn num_segments(&self) -> u32 {
        if self.num_keys > 0 {
            self.num_keys - 1
        } else {
            0
        }
    }
}

/// Host-side change tags consumed by the refit pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MeshUpdate {
    Positions = 0,
    CurveKeys = 1,
    Topology = 2,
}

impl From<MeshUpdate> for u8 {
    fn from(f: MeshUpdate) -> u8 {
        f as u8
    }
}

/// Geometry as resolved by the host: triangles and/or curves, plus optional
/// per-time-step motion data.
///
/// Motion attributes hold `motion_steps - 1` sets of values; the middle step
/// is the rest data and is not duplicated in the attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,

    pub verts: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,

    pub curve_keys: Vec<Vec3>,
    pub curve_radius: Vec<f32>,
    pub curves: Vec<Curve>,

    /// Per-step triangle vertex positions, `verts.len()` entries per step.
    pub motion_verts: Vec<Vec3>,
    /// Per-step curve key positions with radius in `w`, `num_keys()` entries
    /// per step.
    pub motion_keys: Vec<Vec4>,
    /// Total step count including the middle/rest step; odd when > 1.
    pub motion_steps: usize,

    /// Offsets into the global mesh pool, assigned by `Scene::prepare`.
    pub tri_offset: usize,
    pub curve_offset: usize,

    pub users: usize,
    pub is_instanced: bool,

    pub update_flags: Flags,
    pub bounds: Aabb,
}

impl Mesh {
    pub fn new<S: AsRef<str>>(name: S) -> Mesh {
        Mesh {
            name: String::from(name.as_ref()),
            verts: Vec::new(),
            triangles: Vec::new(),
            curve_keys: Vec::new(),
            curve_radius: Vec::new(),
            curves: Vec::new(),
            motion_verts: Vec::new(),
            motion_keys: Vec::new(),
            motion_steps: 1,
            tri_offset: 0,
            curve_offset: 0,
            users: 0,
            is_instanced: false,
            update_flags: Flags::new(),
            bounds: Aabb::new(),
        }
    }

    pub fn set_triangles(&mut self, verts: Vec<Vec3>, triangles: Vec<[u32; 3]>) {
        self.verts = verts;
        self.triangles = triangles;
        self.update_flags.set_flag(MeshUpdate::Topology);
    }

    pub fn add_curve(&mut self, keys: &[Vec3], radius: &[f32]) {
        assert_eq!(keys.len(), radius.len());
        self.curves.push(Curve {
            first_key: self.curve_keys.len() as u32,
            num_keys: keys.len() as u32,
        });
        self.curve_keys.extend_from_slice(keys);
        self.curve_radius.extend_from_slice(radius);
        self.update_flags.set_flag(MeshUpdate::Topology);
    }

    /// Installs a triangle motion attribute with `steps` total time steps.
    /// `verts` holds `steps - 1` position sets; the middle step is taken from
    /// the rest positions.
    pub fn set_motion_verts(&mut self, steps: usize, verts: Vec<Vec3>) {
        assert_eq!(verts.len(), self.verts.len() * (steps - 1));
        self.motion_steps = steps;
        self.motion_verts = verts;
    }

    /// Installs a curve motion attribute, `(position, radius)` per key.
    pub fn set_motion_keys(&mut self, steps: usize, keys: Vec<Vec4>) {
        assert_eq!(keys.len(), self.num_keys() * (steps - 1));
        self.motion_steps = steps;
        self.motion_keys = keys;
    }

    pub fn tag_update(&mut self, update: MeshUpdate) {
        self.update_flags.set_flag(update);
    }

    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    pub fn num_curves(&self) -> usize {
        self.curves.len()
    }

    pub fn num_keys(&self) -> usize {
        self.curve_keys.len()
    }

    pub fn num_segments(&self) -> usize {
        self.curves.iter().map(|c| c.num_segments() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty() && self.curves.is_empty()
    }

    /// Instanced meshes get their own bottom-level acceleration structure;
    /// everything else is folded into the top level directly.
    pub fn need_build_bvh(&self) -> bool {
        self.is_instanced
    }

    pub fn compute_bounds(&mut self) {
        let mut bounds = Aabb::new();
        for v in self.verts.iter() {
            bounds.grow(*v);
        }
        for (key, radius) in self.curve_keys.iter().zip(self.curve_radius.iter()) {
            bounds.grow(*key - Vec3::splat(*radius));
            bounds.grow(*key + Vec3::splat(*radius));
        }
        for v in self.motion_verts.iter() {
            bounds.grow(*v);
        }
        for key in self.motion_keys.iter() {
            let radius = key.w();
            bounds.grow(Vec3::from(key.truncate()) - Vec3::splat(radius));
            bounds.grow(Vec3::from(key.truncate()) + Vec3::splat(radius));
        }
        self.bounds = bounds;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_segments() {
        let mut mesh = Mesh::new("hair");
        mesh.add_curve(
            &[
                Vec3::zero(),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(0.0, 2.0, 0.0),
                Vec3::new(0.0, 3.0, 0.0),
            ],
            &[0.1, 0.1, 0.05, 0.01],
        );
        mesh.add_curve(&[Vec3::zero(), Vec3::one()], &[0.1, 0.1]);

        assert_eq!(mesh.num_curves(), 2);
        assert_eq!(mesh.num_keys(), 6);
        assert_eq!(mesh.num_segments(), 4);
        assert_eq!(mesh.curves[1].first_key, 4);
    }

    #[test]
    fn bounds_include_curve_radius() {
        let mut mesh = Mesh::new("hair");
        mesh.add_curve(&[Vec3::zero(), Vec3::new(1.0, 0.0, 0.0)], &[0.5, 0.5]);
        mesh.compute_bounds();

        assert_eq!(mesh.bounds.min, [-0.5, -0.5, -0.5]);
        assert_eq!(mesh.bounds.max, [1.5, 0.5, 0.5]);
    }

    #[test]
    fn motion_attribute_sizes() {
        let mut mesh = Mesh::new("tri");
        mesh.set_triangles(
            vec![Vec3::zero(), Vec3::one(), Vec3::new(1.0, 0.0, 0.0)],
            vec![[0, 1, 2]],
        );
        mesh.set_motion_verts(3, vec![Vec3::zero(); 6]);
        assert_eq!(mesh.motion_steps, 3);
        assert_eq!(mesh.motion_verts.len(), 6);
    }
}
