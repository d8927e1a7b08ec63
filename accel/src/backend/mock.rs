//! Recording backend used by the tests: every trait call is mirrored into
//! shared state so assertions can inspect what the adapter sent to the
//! library. Buffer contents become visible on geometry commit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{
    BuildQuality, Capability, Device, ErrorFn, FilterFn, Geometry, GeometryKind, MemoryFn, Scene,
    SceneFlags, SceneRef,
};

pub struct GeomRecord {
    pub kind: GeometryKind,
    pub time_steps: usize,
    pub quality: Option<BuildQuality>,
    pub mask: Option<u32>,
    pub user_data: usize,
    pub tessellation_rate: Option<usize>,
    pub vertices: Vec<Vec<[f32; 4]>>,
    pub indices: Vec<u32>,
    pub tangents: Vec<Vec<[f32; 4]>>,
    pub transforms: Vec<[f32; 16]>,
    pub instanced: bool,
    pub has_intersect_filter: bool,
    pub has_occluded_filter: bool,
    pub commits: usize,
}

impl GeomRecord {
    fn new(kind: GeometryKind) -> GeomRecord {
        GeomRecord {
            kind,
            time_steps: 1,
            quality: None,
            mask: None,
            user_data: 0,
            tessellation_rate: None,
            vertices: Vec::new(),
            indices: Vec::new(),
            tangents: Vec::new(),
            transforms: Vec::new(),
            instanced: false,
            has_intersect_filter: false,
            has_occluded_filter: false,
            commits: 0,
        }
    }
}

#[derive(Default)]
pub struct MockState {
    /// Geometry records in creation order.
    pub geoms: Mutex<Vec<Arc<Mutex<GeomRecord>>>>,
    /// Geometry ids in attach order.
    pub attach_order: Mutex<Vec<u32>>,
    pub scene_commits: AtomicUsize,
    pub scene_flags: Mutex<Option<SceneFlags>>,
    pub scene_quality: Mutex<Option<BuildQuality>>,
    pub error_handler: Mutex<Option<ErrorFn>>,
    pub memory_monitor: Mutex<Option<MemoryFn>>,
}

impl MockState {
    pub fn geom(&self, index: usize) -> Arc<Mutex<GeomRecord>> {
        self.geoms.lock().unwrap()[index].clone()
    }

    pub fn num_geoms(&self) -> usize {
        self.geoms.lock().unwrap().len()
    }

    pub fn attach_order(&self) -> Vec<u32> {
        self.attach_order.lock().unwrap().clone()
    }

    pub fn scene_commits(&self) -> usize {
        self.scene_commits.load(Ordering::SeqCst)
    }
}

pub struct MockDevice {
    pub state: Arc<MockState>,
    pub max_motion_steps: usize,
    pub fail_vertex_alloc: bool,
    pub missing: Vec<Capability>,
    pub backface_culling: bool,
}

impl MockDevice {
    pub fn new() -> MockDevice {
        MockDevice {
            state: Arc::new(MockState::default()),
            max_motion_steps: 16,
            fail_vertex_alloc: false,
            missing: Vec::new(),
            backface_culling: false,
        }
    }

    pub fn with_max_motion_steps(mut self, steps: usize) -> MockDevice {
        self.max_motion_steps = steps;
        self
    }

    pub fn with_failing_vertex_alloc(mut self) -> MockDevice {
        self.fail_vertex_alloc = true;
        self
    }
}

impl Device for MockDevice {
    fn has_capability(&self, capability: Capability) -> bool {
        match capability {
            Capability::BackfaceCulling => self.backface_culling,
            _ => !self.missing.contains(&capability),
        }
    }

    fn max_motion_steps(&self) -> usize {
        self.max_motion_steps
    }

    fn create_scene(&self) -> Box<dyn Scene> {
        Box::new(MockScene {
            state: self.state.clone(),
            geoms: HashMap::new(),
        })
    }

    fn create_geometry(&self, kind: GeometryKind) -> Box<dyn Geometry> {
        let record = Arc::new(Mutex::new(GeomRecord::new(kind)));
        self.state.geoms.lock().unwrap().push(record.clone());
        Box::new(MockGeometry {
            record,
            fail_vertex_alloc: self.fail_vertex_alloc,
            time_steps: 1,
            quality: None,
            mask: None,
            user_data: 0,
            tessellation_rate: None,
            vertices: Vec::new(),
            indices: Vec::new(),
            tangents: Vec::new(),
            transforms: Vec::new(),
            instanced_scene: None,
            has_intersect_filter: false,
            has_occluded_filter: false,
        })
    }

    fn set_error_handler(&self, handler: ErrorFn) {
        *self.state.error_handler.lock().unwrap() = Some(handler);
    }

    fn set_memory_monitor(&self, monitor: MemoryFn) {
        *self.state.memory_monitor.lock().unwrap() = Some(monitor);
    }
}

pub struct MockScene {
    state: Arc<MockState>,
    geoms: HashMap<u32, Box<dyn Geometry>>,
}

impl Scene for MockScene {
    fn set_flags(&mut self, flags: SceneFlags) {
        *self.state.scene_flags.lock().unwrap() = Some(flags);
    }

    fn set_build_quality(&mut self, quality: BuildQuality) {
        *self.state.scene_quality.lock().unwrap() = Some(quality);
    }

    fn attach(&mut self, id: u32, geometry: Box<dyn Geometry>) {
        self.state.attach_order.lock().unwrap().push(id);
        self.geoms.insert(id, geometry);
    }

    fn geometry_mut(&mut self, id: u32) -> Option<&mut dyn Geometry> {
        match self.geoms.get_mut(&id) {
            Some(geometry) => Some(geometry.as_mut()),
            None => None,
        }
    }

    fn commit(&mut self, monitor: Option<&mut dyn FnMut(f64) -> bool>) -> bool {
        if let Some(monitor) = monitor {
            for &fraction in &[0.25, 0.5, 0.75, 1.0] {
                if !monitor(fraction) {
                    return false;
                }
            }
        }
        self.state.scene_commits.fetch_add(1, Ordering::SeqCst);
        true
    }
}

pub struct MockGeometry {
    record: Arc<Mutex<GeomRecord>>,
    fail_vertex_alloc: bool,
    time_steps: usize,
    quality: Option<BuildQuality>,
    mask: Option<u32>,
    user_data: usize,
    tessellation_rate: Option<usize>,
    vertices: Vec<Vec<[f32; 4]>>,
    indices: Vec<u32>,
    tangents: Vec<Vec<[f32; 4]>>,
    transforms: Vec<[f32; 16]>,
    instanced_scene: Option<SceneRef>,
    has_intersect_filter: bool,
    has_occluded_filter: bool,
}

impl Geometry for MockGeometry {
    fn set_time_step_count(&mut self, steps: usize) {
        self.time_steps = steps;
    }

    fn set_build_quality(&mut self, quality: BuildQuality) {
        self.quality = Some(quality);
    }

    fn set_mask(&mut self, visibility: u32) {
        self.mask = Some(visibility);
    }

    fn set_user_data(&mut self, value: usize) {
        self.user_data = value;
    }

    fn set_tessellation_rate(&mut self, rate: usize) {
        self.tessellation_rate = Some(rate);
    }

    fn map_vertices(&mut self, step: usize, count: usize) -> Option<&mut [[f32; 4]]> {
        if self.fail_vertex_alloc {
            return None;
        }
        if self.vertices.len() <= step {
            self.vertices.resize(step + 1, Vec::new());
        }
        self.vertices[step] = vec![[0.0; 4]; count];
        Some(&mut self.vertices[step][..])
    }

    fn map_indices(&mut self, count: usize, stride: usize) -> Option<&mut [u32]> {
        self.indices = vec![0; count * stride];
        Some(&mut self.indices[..])
    }

    fn map_tangents(&mut self, step: usize, count: usize) -> Option<&mut [[f32; 4]]> {
        if self.tangents.len() <= step {
            self.tangents.resize(step + 1, Vec::new());
        }
        self.tangents[step] = vec![[0.0; 4]; count];
        Some(&mut self.tangents[step][..])
    }

    fn set_instanced_scene(&mut self, scene: SceneRef) {
        self.instanced_scene = Some(scene);
    }

    fn set_transform(&mut self, step: usize, matrix: &[f32; 16]) {
        if self.transforms.len() <= step {
            self.transforms.resize(step + 1, [0.0; 16]);
        }
        self.transforms[step] = *matrix;
    }

    fn set_intersect_filter(&mut self, _filter: FilterFn) {
        self.has_intersect_filter = true;
    }

    fn set_occluded_filter(&mut self, _filter: FilterFn) {
        self.has_occluded_filter = true;
    }

    fn commit(&mut self) {
        let mut record = self.record.lock().unwrap();
        record.time_steps = self.time_steps;
        record.quality = self.quality;
        record.mask = self.mask;
        record.user_data = self.user_data;
        record.tessellation_rate = self.tessellation_rate;
        record.vertices = self.vertices.clone();
        record.indices = self.indices.clone();
        record.tangents = self.tangents.clone();
        record.transforms = self.transforms.clone();
        record.instanced = self.instanced_scene.is_some();
        record.has_intersect_filter = self.has_intersect_filter;
        record.has_occluded_filter = self.has_occluded_filter;
        record.commits += 1;
    }
}

/// Wraps a mock device in a fresh manager-acquired handle for tests.
pub fn test_device(device: MockDevice) -> (crate::device::DeviceHandle, Arc<MockState>) {
    let state = device.state.clone();
    let manager = crate::device::DeviceManager::new();
    let handle = manager
        .acquire(move || Ok(Box::new(device) as Box<dyn Device>))
        .unwrap();
    (handle, state)
}
