//! Flattens bottom-level packs into the top-level pack after commit, so the
//! shading kernels address one global table regardless of instancing.

use std::collections::{HashMap, HashSet};

use crate::builder::{BuildInput, BVH};
use crate::pack::PrimitiveRef;

impl BVH {
    /// Runs strictly after a top-level commit: local primitive indices become
    /// global mesh-pool indices, and every instanced mesh's bottom-level pack
    /// is copied in exactly once (objects sharing a mesh share the merged
    /// range through `object_node`).
    pub(crate) fn pack_instances(&mut self, input: &BuildInput) {
        let scene = input.scene;

        // the top level's own directly-added primitives first
        for k in 0..self.pack.len() {
            let index = self.pack.prim_index[k];
            if index == -1 {
                continue;
            }
            let mesh = &scene.meshes[scene.objects[self.pack.prim_object[k] as usize].mesh];
            let offset = match PrimitiveRef::unpack(self.pack.prim_type[k]) {
                Some(PrimitiveRef::CurveSegment(_)) => mesh.curve_offset,
                _ => mesh.tri_offset,
            };
            self.pack.prim_index[k] = index + offset as i32;
        }

        // required size over unique meshes that carry their own BVH
        let mut extra_prims = 0;
        let mut extra_tri_verts = 0;
        let mut seen: HashSet<usize> = HashSet::new();
        for ob in scene.objects.iter() {
            let mesh = &scene.meshes[ob.mesh];
            if !mesh.need_build_bvh() || !seen.insert(ob.mesh) {
                continue;
            }
            if let Some(sub) = input.sub_bvh(ob.mesh) {
                extra_prims += sub.pack.len();
                extra_tri_verts += sub.pack.prim_tri_verts.len();
            }
        }

        let base = self.pack.len();
        let tri_verts_base = self.pack.prim_tri_verts.len();
        self.pack.prim_type.resize(base + extra_prims, 0);
        self.pack.prim_index.resize(base + extra_prims, -1);
        self.pack.prim_object.resize(base + extra_prims, 0);
        self.pack.prim_tri_index.resize(base + extra_prims, -1);
        self.pack
            .prim_tri_verts
            .resize(tri_verts_base + extra_tri_verts, [[0.0; 4]; 3]);

        let mut merged: HashMap<usize, u32> = HashMap::new();
        let mut write = base;
        let mut tri_vert_write = tri_verts_base;
        for (i, ob) in scene.objects.iter().enumerate() {
            let mesh = &scene.meshes[ob.mesh];
            if !ob.is_traceable(mesh) || !mesh.need_build_bvh() {
                // object_node was recorded during population
                continue;
            }
            if let Some(&offset) = merged.get(&ob.mesh) {
                self.pack.object_node[i] = offset;
                continue;
            }
            let sub = match input.sub_bvh(ob.mesh) {
                Some(sub) => sub,
                None => continue,
            };
            merged.insert(ob.mesh, write as u32);
            self.pack.object_node[i] = write as u32;

            let tv_base = tri_vert_write as i32;
            for k in 0..sub.pack.len() {
                let ty = sub.pack.prim_type[k];
                self.pack.prim_type[write] = ty;
                self.pack.prim_object[write] = sub.pack.prim_object[k];

                let index = sub.pack.prim_index[k];
                self.pack.prim_index[write] = if index == -1 {
                    -1
                } else {
                    let offset = match PrimitiveRef::unpack(ty) {
                        Some(PrimitiveRef::CurveSegment(_)) => mesh.curve_offset,
                        _ => mesh.tri_offset,
                    };
                    index + offset as i32
                };

                let tri_index = sub.pack.prim_tri_index[k];
                self.pack.prim_tri_index[write] = if tri_index == -1 {
                    -1
                } else {
                    tri_index + tv_base
                };
                write += 1;
            }
            for verts in sub.pack.prim_tri_verts.iter() {
                self.pack.prim_tri_verts[tri_vert_write] = *verts;
                tri_vert_write += 1;
            }
        }
    }
}
