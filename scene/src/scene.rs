use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::objects::{Mesh, Object};

/// The resolved renderable set handed to the acceleration adapters: a mesh
/// pool plus the objects placing those meshes. Host-side scene graph
/// synchronization has already happened by the time this exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub meshes: Vec<Mesh>,
    pub objects: Vec<Object>,
}

impl Scene {
    pub fn new() -> Scene {
        Scene {
            meshes: Vec::new(),
            objects: Vec::new(),
        }
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn add_object(&mut self, object: Object) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    /// Resolves derived state before acceleration builds run: per-mesh user
    /// counts and instancing, global mesh-pool offsets, and bounds.
    pub fn prepare(&mut self) {
        for mesh in self.meshes.iter_mut() {
            mesh.users = 0;
        }
        for object in self.objects.iter() {
            self.meshes[object.mesh].users += 1;
        }

        let mut tri_offset = 0;
        let mut curve_offset = 0;
        for mesh in self.meshes.iter_mut() {
            mesh.is_instanced = mesh.users > 1;
            mesh.tri_offset = tri_offset;
            mesh.curve_offset = curve_offset;
            tri_offset += mesh.num_triangles();
            curve_offset += mesh.num_curves();
        }

        self.meshes.par_iter_mut().for_each(|m| m.compute_bounds());

        log::debug!(
            "scene prepared: {} meshes, {} objects",
            self.meshes.len(),
            self.objects.len()
        );
    }
}

impl Default for Scene {
    fn default() -> Scene {
        Scene::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::*;

    fn triangle_mesh(name: &str, num_tris: usize) -> Mesh {
        let mut mesh = Mesh::new(name);
        let mut verts = Vec::new();
        let mut triangles = Vec::new();
        for i in 0..num_tris {
            let base = (i * 3) as u32;
            let x = i as f32;
            verts.push(Vec3::new(x, 0.0, 0.0));
            verts.push(Vec3::new(x + 1.0, 0.0, 0.0));
            verts.push(Vec3::new(x, 1.0, 0.0));
            triangles.push([base, base + 1, base + 2]);
        }
        mesh.set_triangles(verts, triangles);
        mesh
    }

    #[test]
    fn prepare_counts_users_and_instancing() {
        let mut scene = Scene::new();
        let shared = scene.add_mesh(triangle_mesh("shared", 1));
        let unique = scene.add_mesh(triangle_mesh("unique", 2));
        scene.add_object(Object::new("a", shared));
        scene.add_object(Object::new("b", shared));
        scene.add_object(Object::new("c", unique));
        scene.prepare();

        assert_eq!(scene.meshes[shared].users, 2);
        assert!(scene.meshes[shared].is_instanced);
        assert_eq!(scene.meshes[unique].users, 1);
        assert!(!scene.meshes[unique].is_instanced);
    }

    #[test]
    fn prepare_assigns_pool_offsets() {
        let mut scene = Scene::new();
        scene.add_mesh(triangle_mesh("a", 2));
        let mut hair = Mesh::new("hair");
        hair.add_curve(&[Vec3::zero(), Vec3::one()], &[0.1, 0.1]);
        scene.add_mesh(hair);
        scene.add_mesh(triangle_mesh("b", 3));
        scene.prepare();

        assert_eq!(scene.meshes[0].tri_offset, 0);
        assert_eq!(scene.meshes[1].curve_offset, 0);
        assert_eq!(scene.meshes[2].tri_offset, 2);
        assert_eq!(scene.meshes[1].tri_offset, 2);
        assert_eq!(scene.meshes[2].curve_offset, 1);
    }
}
