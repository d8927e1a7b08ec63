pub mod mesh;

pub use mesh::*;

use glam::*;
use serde::{Deserialize, Serialize};

use crate::aabb::Aabb;

/// A renderable placement of a mesh in the scene. `mesh` indexes the scene
/// mesh pool; shared meshes are traced through instance geometry instead of
/// duplicated uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Object {
    pub name: String,
    pub mesh: usize,
    pub transform: Mat4,
    /// Per-motion-step transforms; empty when the object does not move.
    pub motion: Vec<Mat4>,
    pub visibility: u32,
}

impl Object {
    pub fn new<S: AsRef<str>>(name: S, mesh: usize) -> Object {
        Object {
            name: String::from(name.as_ref()),
            mesh,
            transform: Mat4::identity(),
            motion: Vec::new(),
            visibility: !0,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Object {
        self.transform = transform;
        self
    }

    pub fn is_traceable(&self, mesh: &Mesh) -> bool {
        self.visibility != 0 && !mesh.is_empty() && mesh.bounds.is_valid()
    }

    pub fn num_motion_steps(&self) -> usize {
        if self.motion.is_empty() {
            1
        } else {
            self.motion.len()
        }
    }

    pub fn transform_at(&self, step: usize) -> Mat4 {
        if self.motion.is_empty() {
            self.transform
        } else {
            self.motion[step]
        }
    }

    pub fn bounds(&self, mesh: &Mesh) -> Aabb {
        mesh.bounds.transformed(self.transform)
    }
}
