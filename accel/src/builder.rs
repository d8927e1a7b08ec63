//! Scene construction: one adapter instance owns one library scene, either a
//! single mesh's primitives (bottom level) or the whole renderable object set
//! with instance references (top level).

use std::sync::{Arc, Mutex};

use log::error;

use crate::backend::{Geometry as _, GeometryKind, Scene as _, SceneRef};
use crate::device::DeviceHandle;
use crate::filter::{intersect_filter, occluded_filter, FilterPolicy};
use crate::monitor::{Progress, ProgressThrottle};
use crate::pack::{GeomId, Pack};
use crate::params::BVHParams;
use crate::upload::*;
use iris_scene::{Mesh, Object, Scene};

/// Inputs for one build or refit: the prepared scene plus the already-built
/// bottom-level adapters for instanced meshes, indexed by mesh id. The host
/// builds bottom levels before the top level; this core relies on that
/// ordering.
pub struct BuildInput<'a> {
    pub scene: &'a Scene,
    pub mesh_bvhs: &'a [Option<&'a BVH>],
}

impl<'a> BuildInput<'a> {
    pub fn new(scene: &'a Scene) -> BuildInput<'a> {
        BuildInput {
            scene,
            mesh_bvhs: &[],
        }
    }

    pub fn with_mesh_bvhs(scene: &'a Scene, mesh_bvhs: &'a [Option<&'a BVH>]) -> BuildInput<'a> {
        BuildInput { scene, mesh_bvhs }
    }

    pub(crate) fn sub_bvh(&self, mesh: usize) -> Option<&'a BVH> {
        match self.mesh_bvhs.get(mesh) {
            Some(Some(bvh)) => Some(*bvh),
            _ => None,
        }
    }
}

/// Acceleration-structure adapter for one scene or mesh.
///
/// Owns the library scene handle and the flat [`Pack`] tables addressed by
/// the intersection results. A bottom-level adapter's scene stays alive while
/// any top-level instance geometry still references it, because instances
/// hold clones of the shared handle.
pub struct BVH {
    pub params: BVHParams,
    pub pack: Pack,
    pub(crate) device: DeviceHandle,
    pub(crate) policy: FilterPolicy,
    pub(crate) scene: Option<SceneRef>,
}

impl BVH {
    pub fn new(params: BVHParams, device: DeviceHandle) -> BVH {
        BVH {
            params,
            pack: Pack::new(),
            device,
            policy: FilterPolicy::default(),
            scene: None,
        }
    }

    pub fn set_filter_policy(&mut self, policy: FilterPolicy) {
        self.policy = policy;
    }

    /// The committed library scene, `None` until a successful `build`.
    pub fn scene(&self) -> Option<&SceneRef> {
        self.scene.as_ref()
    }

    /// Full build: populate geometry for every object, commit, and (top
    /// level) flatten the bottom-level tables. Cancellation is checked per
    /// object and through the commit monitor; a cancelled build leaves the
    /// adapter empty.
    pub fn build(&mut self, input: &BuildInput, progress: &Progress) {
        self.scene = None;
        self.pack.clear();

        let scene: SceneRef = Arc::new(Mutex::new(self.device.backend().create_scene()));
        {
            let mut guard = scene.lock().unwrap();
            guard.set_flags(self.params.scene_flags());
            guard.set_build_quality(self.params.scene_build_quality());
        }

        let (num_prims, num_tri_verts) = self.count_primitives(input);
        self.pack.reserve(num_prims, num_tri_verts);
        self.pack.object_node = vec![0; input.scene.objects.len()];

        for (i, ob) in input.scene.objects.iter().enumerate() {
            if progress.is_cancelled() {
                self.pack.clear();
                return;
            }
            let mesh = &input.scene.meshes[ob.mesh];
            if self.params.top_level {
                if !ob.is_traceable(mesh) {
                    continue;
                }
                if mesh.need_build_bvh() {
                    self.add_instance(&scene, i, ob, mesh, input);
                    continue;
                }
            }
            self.add_object(&scene, i, ob, mesh);
        }
        if progress.is_cancelled() {
            self.pack.clear();
            return;
        }

        let committed = {
            let mut throttle = ProgressThrottle::new(progress);
            let mut guard = scene.lock().unwrap();
            guard.commit(Some(&mut |fraction| throttle.update(fraction)))
        };
        if !committed {
            self.pack.clear();
            return;
        }

        self.scene = Some(scene);
        if self.params.top_level {
            self.pack_instances(input);
        }
    }

    /// Primitive totals over the same object walk `build` does, so the pack
    /// tables can be sized once up front.
    fn count_primitives(&self, input: &BuildInput) -> (usize, usize) {
        let mut prims = 0;
        let mut tri_verts = 0;
        for ob in input.scene.objects.iter() {
            let mesh = &input.scene.meshes[ob.mesh];
            if self.params.top_level {
                if !ob.is_traceable(mesh) {
                    continue;
                }
                if mesh.need_build_bvh() {
                    prims += 1;
                    continue;
                }
            }
            if self.params.primitive_mask.triangles {
                prims += mesh.num_triangles();
                tri_verts += mesh.num_triangles();
            }
            if self.params.primitive_mask.curves {
                prims += mesh.num_segments();
            }
        }
        (prims, tri_verts)
    }

    fn add_object(&mut self, scene: &SceneRef, i: usize, ob: &Object, mesh: &Mesh) {
        self.pack.object_node[i] = self.pack.len() as u32;
        if self.params.primitive_mask.triangles && mesh.num_triangles() > 0 {
            self.add_triangles(scene, i, ob, mesh);
        }
        if self.params.primitive_mask.curves && mesh.num_curves() > 0 {
            self.add_curves(scene, i, ob, mesh);
        }
    }

    fn add_triangles(&mut self, scene: &SceneRef, i: usize, ob: &Object, mesh: &Mesh) {
        let num_steps = clamped_motion_steps(
            mesh.motion_steps,
            !mesh.motion_verts.is_empty(),
            self.device.backend().max_motion_steps(),
            self.params.use_motion_blur,
        );

        let mut geom = self
            .device
            .backend()
            .create_geometry(GeometryKind::Triangles);
        geom.set_build_quality(self.params.geometry_build_quality());
        geom.set_time_step_count(num_steps);
        geom.set_user_data(self.pack.len());
        geom.set_mask(ob.visibility);
        geom.set_intersect_filter(intersect_filter(self.policy.clone(), false));
        geom.set_occluded_filter(occluded_filter(self.policy.clone(), false));

        if !set_tri_index_buffer(geom.as_mut(), mesh)
            || !set_tri_vertex_buffer(geom.as_mut(), mesh, num_steps)
        {
            // logged with the mesh name; skip the mesh, keep the build going
            return;
        }

        for tri in 0..mesh.num_triangles() {
            self.pack.push_triangle(i, tri, triangle_verts(mesh, tri));
        }

        geom.commit();
        scene.lock().unwrap().attach(GeomId::triangles(i).raw(), geom);
    }

    fn add_curves(&mut self, scene: &SceneRef, i: usize, ob: &Object, mesh: &Mesh) {
        let num_steps = clamped_motion_steps(
            mesh.motion_steps,
            !mesh.motion_keys.is_empty(),
            self.device.backend().max_motion_steps(),
            self.params.use_motion_blur,
        );

        let kind = self.params.curve_geometry_kind();
        let mut geom = self.device.backend().create_geometry(kind);
        geom.set_build_quality(self.params.geometry_build_quality());
        geom.set_time_step_count(num_steps);
        geom.set_user_data(self.pack.len());
        geom.set_mask(ob.visibility);
        if kind != GeometryKind::RoundHermiteCurve {
            geom.set_tessellation_rate(self.params.curve_subdivisions + 1);
        }
        geom.set_intersect_filter(intersect_filter(self.policy.clone(), true));
        geom.set_occluded_filter(occluded_filter(self.policy.clone(), true));

        let filled = set_curve_index_buffer(geom.as_mut(), mesh)
            && set_curve_vertex_buffer(geom.as_mut(), mesh, num_steps)
            && (!self.params.curves_need_tangents()
                || set_curve_tangent_buffer(geom.as_mut(), mesh, num_steps));
        if !filled {
            return;
        }

        for (c, curve) in mesh.curves.iter().enumerate() {
            for segment in 0..curve.num_segments() {
                self.pack.push_curve_segment(i, c, segment);
            }
        }

        geom.commit();
        scene.lock().unwrap().attach(GeomId::curves(i).raw(), geom);
    }

    fn add_instance(
        &mut self,
        scene: &SceneRef,
        i: usize,
        ob: &Object,
        mesh: &Mesh,
        input: &BuildInput,
    ) {
        let sub = match input.sub_bvh(ob.mesh).and_then(|bvh| bvh.scene()) {
            Some(sub) => sub.clone(),
            None => {
                error!("no bottom-level BVH for instanced mesh {}", mesh.name);
                return;
            }
        };

        let num_steps = if self.params.use_motion_blur && !ob.motion.is_empty() {
            ob.motion.len().min(self.device.backend().max_motion_steps())
        } else {
            1
        };

        let mut geom = self.device.backend().create_geometry(GeometryKind::Instance);
        geom.set_instanced_scene(sub);
        geom.set_time_step_count(num_steps);
        for step in 0..num_steps {
            let transform = ob.transform_at(step);
            geom.set_transform(step, transform.as_ref());
        }
        geom.set_user_data(self.pack.len());
        geom.set_mask(ob.visibility);

        self.pack.object_node[i] = self.pack.len() as u32;
        self.pack.push_instance(i);

        geom.commit();
        scene.lock().unwrap().attach(GeomId::instance(i).raw(), geom);
    }
}
