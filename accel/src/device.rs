//! Shared lifetime management for the acceleration-library device.
//!
//! Device creation is expensive and one device serves every adapter, so the
//! manager hands out reference-counted handles: the backend device is created
//! on first acquire and destroyed when the last handle drops; the next
//! acquire recreates it.

use std::sync::{Arc, Mutex, Weak};

use log::{error, warn};
use thiserror::Error;

use crate::backend::{Capability, Device, MemoryFn};
use crate::monitor::{MemoryTracker, RenderStats};

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("acceleration device creation failed: {0}")]
    Creation(String),
}

pub struct DeviceInner {
    backend: Box<dyn Device>,
    memory: Arc<MemoryTracker>,
}

/// Cloneable handle keeping the shared device alive.
#[derive(Clone)]
pub struct DeviceHandle(Arc<DeviceInner>);

impl DeviceHandle {
    pub fn backend(&self) -> &dyn Device {
        self.0.backend.as_ref()
    }

    pub fn memory(&self) -> &Arc<MemoryTracker> {
        &self.0.memory
    }

    /// Binds host statistics; allocation deltas reported before this call
    /// were accumulated and are flushed into `stats` now.
    pub fn attach_stats(&self, stats: Arc<RenderStats>) {
        self.0.memory.attach(stats);
    }

    pub fn same_device(&self, other: &DeviceHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

pub struct DeviceManager {
    shared: Mutex<Weak<DeviceInner>>,
}

impl DeviceManager {
    pub fn new() -> DeviceManager {
        DeviceManager {
            shared: Mutex::new(Weak::new()),
        }
    }

    /// Returns the shared device, creating it through `create` when no live
    /// handle exists. Capability problems are logged and asserted in debug
    /// builds only; rendering continues degraded.
    pub fn acquire<F>(&self, create: F) -> Result<DeviceHandle, DeviceError>
    where
        F: FnOnce() -> Result<Box<dyn Device>, DeviceError>,
    {
        let mut shared = self.shared.lock().unwrap();
        if let Some(inner) = shared.upgrade() {
            return Ok(DeviceHandle(inner));
        }

        let backend = create()?;
        validate_capabilities(backend.as_ref());
        backend.set_error_handler(Box::new(|message| {
            error!("acceleration device error: {}", message);
        }));

        let memory = Arc::new(MemoryTracker::new());
        let monitor: MemoryFn = {
            let tracker = memory.clone();
            Box::new(move |delta| {
                tracker.add(delta);
                true
            })
        };
        backend.set_memory_monitor(monitor);

        let inner = Arc::new(DeviceInner { backend, memory });
        *shared = Arc::downgrade(&inner);
        Ok(DeviceHandle(inner))
    }
}

impl Default for DeviceManager {
    fn default() -> DeviceManager {
        DeviceManager::new()
    }
}

fn validate_capabilities(device: &dyn Device) {
    let required = [
        Capability::TriangleGeometry,
        Capability::CurveGeometry,
        Capability::RayMasking,
        Capability::FilterFunctions,
    ];
    for &capability in required.iter() {
        if !device.has_capability(capability) {
            error!(
                "acceleration device is missing {:?} support, rendering may be incorrect",
                capability
            );
            debug_assert!(
                device.has_capability(capability),
                "device lacks required capability"
            );
        }
    }
    if device.has_capability(Capability::BackfaceCulling) {
        warn!("acceleration device was built with back-face culling, hair renders may be wrong");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{MockDevice, MockState};

    fn factory() -> (
        impl FnOnce() -> Result<Box<dyn Device>, DeviceError>,
        Arc<MockState>,
    ) {
        let device = MockDevice::new();
        let state = device.state.clone();
        (move || Ok(Box::new(device) as Box<dyn Device>), state)
    }

    #[test]
    fn acquire_shares_one_device() {
        let manager = DeviceManager::new();
        let (create, _state) = factory();
        let a = manager.acquire(create).unwrap();
        let b = manager
            .acquire(|| panic!("second acquire must reuse the live device"))
            .unwrap();
        assert!(a.same_device(&b));
    }

    #[test]
    fn device_recreated_after_all_handles_drop() {
        let manager = DeviceManager::new();
        let (create, first_state) = factory();
        let handle = manager.acquire(create).unwrap();
        drop(handle);

        let (create, second_state) = factory();
        let handle = manager.acquire(create).unwrap();
        assert!(!Arc::ptr_eq(&first_state, &second_state));
        assert_eq!(handle.backend().max_motion_steps(), 16);
    }

    #[test]
    fn creation_failure_propagates() {
        let manager = DeviceManager::new();
        let result = manager.acquire(|| Err(DeviceError::Creation(String::from("no driver"))));
        assert!(result.is_err());
    }

    #[test]
    fn error_and_memory_callbacks_installed() {
        let manager = DeviceManager::new();
        let (create, state) = factory();
        let handle = manager.acquire(create).unwrap();

        assert!(state.error_handler.lock().unwrap().is_some());

        // drive the registered monitor the way the library would
        let accepted = match &*state.memory_monitor.lock().unwrap() {
            Some(monitor) => monitor(2048),
            None => false,
        };
        assert!(accepted);
        assert_eq!(handle.memory().unattached_bytes(), 2048);

        let stats = Arc::new(RenderStats::new());
        handle.attach_stats(stats.clone());
        assert_eq!(stats.bytes(), 2048);
        assert_eq!(handle.memory().unattached_bytes(), 0);
    }
}
