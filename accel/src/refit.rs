//! Per-frame vertex updates for scenes whose topology is stable: re-upload
//! changed vertex/tangent buffers, recommit the touched geometries, then
//! recommit the scene once. Much cheaper than a rebuild.

use crate::backend::{Geometry as _, Scene as _};
use crate::builder::{BuildInput, BVH};
use crate::monitor::{Progress, ProgressThrottle};
use crate::pack::GeomId;
use crate::upload::*;
use iris_scene::MeshUpdate;

impl BVH {
    /// Updates vertex data in place for every object that is either bottom
    /// level or directly traced (instanced objects move through their
    /// per-step instance transforms instead). Array sizes are unchanged
    /// afterwards; only buffer contents differ.
    pub fn refit(&mut self, input: &BuildInput, progress: &Progress) {
        let scene = match self.scene.as_ref() {
            Some(scene) => scene.clone(),
            None => return,
        };
        let mut guard = scene.lock().unwrap();

        for (i, ob) in input.scene.objects.iter().enumerate() {
            if progress.is_cancelled() {
                return;
            }
            let mesh = &input.scene.meshes[ob.mesh];
            if self.params.top_level && (!ob.is_traceable(mesh) || mesh.need_build_bvh()) {
                continue;
            }

            if self.params.primitive_mask.triangles
                && mesh.num_triangles() > 0
                && mesh.update_flags.has_flag(MeshUpdate::Positions)
            {
                let num_steps = clamped_motion_steps(
                    mesh.motion_steps,
                    !mesh.motion_verts.is_empty(),
                    self.device.backend().max_motion_steps(),
                    self.params.use_motion_blur,
                );
                if let Some(geom) = guard.geometry_mut(GeomId::triangles(i).raw()) {
                    if set_tri_vertex_buffer(geom, mesh, num_steps) {
                        geom.commit();
                    }
                }
                // keep the flattened shading verts in step
                let first = self.pack.object_node[i] as usize;
                for tri in 0..mesh.num_triangles() {
                    let slot = self.pack.prim_tri_index[first + tri];
                    if slot >= 0 {
                        self.pack.prim_tri_verts[slot as usize] = triangle_verts(mesh, tri);
                    }
                }
            }

            if self.params.primitive_mask.curves
                && mesh.num_curves() > 0
                && mesh.update_flags.has_flag(MeshUpdate::CurveKeys)
            {
                let num_steps = clamped_motion_steps(
                    mesh.motion_steps,
                    !mesh.motion_keys.is_empty(),
                    self.device.backend().max_motion_steps(),
                    self.params.use_motion_blur,
                );
                if let Some(geom) = guard.geometry_mut(GeomId::curves(i).raw()) {
                    let filled = set_curve_vertex_buffer(geom, mesh, num_steps)
                        && (!self.params.curves_need_tangents()
                            || set_curve_tangent_buffer(geom, mesh, num_steps));
                    if filled {
                        geom.commit();
                    }
                }
            }
        }

        let mut throttle = ProgressThrottle::new(progress);
        guard.commit(Some(&mut |fraction| throttle.update(fraction)));
    }
}
