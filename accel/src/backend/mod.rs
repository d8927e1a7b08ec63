//! Contract of the external ray-tracing acceleration library.
//!
//! The adapter drives the library exclusively through these traits; the
//! library's BVH construction and traversal stay opaque behind them. Buffer
//! mapping returns `None` where the C API would hand back a null pointer on
//! allocation failure.

use std::sync::{Arc, Mutex};

use crate::filter::IntersectContext;

#[cfg(test)]
pub(crate) mod mock;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GeometryKind {
    Triangles,
    FlatLinearCurve,
    FlatHermiteCurve,
    RoundHermiteCurve,
    Instance,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BuildQuality {
    Low,
    Medium,
    High,
    Refit,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SceneFlags {
    pub dynamic: bool,
    pub compact: bool,
    pub robust: bool,
}

/// Hardware/driver features queried by named property on the device.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Capability {
    TriangleGeometry,
    CurveGeometry,
    RayMasking,
    FilterFunctions,
    /// Compiled-in back-face culling; must be off for hair to shade right.
    BackfaceCulling,
}

/// Candidate hit handed to filter callbacks during traversal.
///
/// `u`/`v` carry the library's native barycentrics; the remap to renderer
/// conventions happens in [`crate::pack::Pack::intersection_from_hit`].
#[derive(Debug, Copy, Clone)]
pub struct RayHit {
    pub geom_id: u32,
    /// Geometry id of the enclosing instance, if the hit went through one.
    pub instance_id: Option<u32>,
    pub prim_id: u32,
    /// User data of the geometry that was hit (its first pack offset).
    pub user_data: usize,
    pub t: f32,
    pub u: f32,
    pub v: f32,
    pub ng: [f32; 3],
    pub ray_dir: [f32; 3],
}

/// Verdict of a filter callback. `Reject` clears the library's hit-valid
/// flag, telling the traversal to keep searching.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Accept,
    Reject,
}

pub type FilterFn = Arc<dyn Fn(&RayHit, &mut IntersectContext) -> FilterDecision + Send + Sync>;
pub type ErrorFn = Box<dyn Fn(&str) + Send + Sync>;
/// Receives allocation deltas in bytes; returning `false` fails the
/// allocation.
pub type MemoryFn = Box<dyn Fn(isize) -> bool + Send + Sync>;

/// Shared handle to a committed scene. Instance geometries hold a clone, so a
/// bottom-level scene is released only once no instance references it.
pub type SceneRef = Arc<Mutex<Box<dyn Scene>>>;

pub trait Device: Send + Sync {
    fn has_capability(&self, capability: Capability) -> bool;
    /// Largest number of motion time steps a single geometry may carry.
    fn max_motion_steps(&self) -> usize;
    fn create_scene(&self) -> Box<dyn Scene>;
    fn create_geometry(&self, kind: GeometryKind) -> Box<dyn Geometry>;
    fn set_error_handler(&self, handler: ErrorFn);
    fn set_memory_monitor(&self, monitor: MemoryFn);
}

pub trait Scene: Send {
    fn set_flags(&mut self, flags: SceneFlags);
    fn set_build_quality(&mut self, quality: BuildQuality);
    fn attach(&mut self, id: u32, geometry: Box<dyn Geometry>);
    fn geometry_mut(&mut self, id: u32) -> Option<&mut dyn Geometry>;
    /// Builds the internal acceleration structure, blocking until done. The
    /// monitor is polled with a completion fraction; returning `false`
    /// cancels the build, in which case `commit` returns `false`.
    fn commit(&mut self, monitor: Option<&mut dyn FnMut(f64) -> bool>) -> bool;
}

pub trait Geometry: Send {
    fn set_time_step_count(&mut self, steps: usize);
    fn set_build_quality(&mut self, quality: BuildQuality);
    fn set_mask(&mut self, visibility: u32);
    fn set_user_data(&mut self, value: usize);
    fn set_tessellation_rate(&mut self, rate: usize);

    /// Allocates the vertex buffer for one time step; position in `xyz`,
    /// curve radius in `w`.
    fn map_vertices(&mut self, step: usize, count: usize) -> Option<&mut [[f32; 4]]>;
    /// Allocates the index buffer: `count` primitives, `stride` indices each.
    fn map_indices(&mut self, count: usize, stride: usize) -> Option<&mut [u32]>;
    /// Allocates the hermite tangent buffer for one time step.
    fn map_tangents(&mut self, step: usize, count: usize) -> Option<&mut [[f32; 4]]>;

    fn set_instanced_scene(&mut self, scene: SceneRef);
    fn set_transform(&mut self, step: usize, matrix: &[f32; 16]);

    fn set_intersect_filter(&mut self, filter: FilterFn);
    fn set_occluded_filter(&mut self, filter: FilterFn);

    fn commit(&mut self);
}
