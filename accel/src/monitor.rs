//! Host-facing progress and memory accounting hooks.

use std::sync::atomic::{AtomicBool, AtomicIsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Cancellation flag plus a substatus line, shared with the host UI.
pub struct Progress {
    cancel: AtomicBool,
    substatus: Mutex<String>,
}

impl Progress {
    pub fn new() -> Progress {
        Progress {
            cancel: AtomicBool::new(false),
            substatus: Mutex::new(String::new()),
        }
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn set_substatus(&self, status: &str) {
        *self.substatus.lock().unwrap() = String::from(status);
    }

    pub fn substatus(&self) -> String {
        self.substatus.lock().unwrap().clone()
    }
}

impl Default for Progress {
    fn default() -> Progress {
        Progress::new()
    }
}

/// Commit-monitor adapter: the cancel flag is read on every callback (an
/// atomic load), the substatus string is refreshed at most every 0.25s.
pub struct ProgressThrottle<'a> {
    progress: &'a Progress,
    last: Instant,
    interval: Duration,
}

impl<'a> ProgressThrottle<'a> {
    pub fn new(progress: &'a Progress) -> ProgressThrottle<'a> {
        ProgressThrottle {
            progress,
            last: Instant::now(),
            interval: Duration::from_millis(250),
        }
    }

    pub fn update(&mut self, fraction: f64) -> bool {
        if self.last.elapsed() >= self.interval {
            self.last = Instant::now();
            self.progress
                .set_substatus(&format!("Building BVH {:.0}%", fraction * 100.0));
        }
        !self.progress.is_cancelled()
    }
}

/// Byte counters exposed to the host statistics view.
#[derive(Default)]
pub struct RenderStats {
    bytes: AtomicIsize,
    peak: AtomicIsize,
}

impl RenderStats {
    pub fn new() -> RenderStats {
        RenderStats::default()
    }

    pub fn add(&self, delta: isize) {
        let now = self.bytes.fetch_add(delta, Ordering::Relaxed) + delta;
        self.peak.fetch_max(now, Ordering::Relaxed);
    }

    pub fn bytes(&self) -> isize {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn peak(&self) -> isize {
        self.peak.load(Ordering::Relaxed)
    }
}

/// Routes library allocation deltas to the attached stats; deltas reported
/// before a stats object exists land in an atomic counter and are flushed on
/// attach, so concurrent bottom-level builds stay race-free.
pub struct MemoryTracker {
    stats: Mutex<Option<Arc<RenderStats>>>,
    unattached: AtomicIsize,
}

impl MemoryTracker {
    pub fn new() -> MemoryTracker {
        MemoryTracker {
            stats: Mutex::new(None),
            unattached: AtomicIsize::new(0),
        }
    }

    pub fn add(&self, delta: isize) {
        match &*self.stats.lock().unwrap() {
            Some(stats) => stats.add(delta),
            None => {
                self.unattached.fetch_add(delta, Ordering::Relaxed);
            }
        }
    }

    pub fn attach(&self, stats: Arc<RenderStats>) {
        let mut slot = self.stats.lock().unwrap();
        let pending = self.unattached.swap(0, Ordering::Relaxed);
        if pending != 0 {
            stats.add(pending);
        }
        *slot = Some(stats);
    }

    pub fn unattached_bytes(&self) -> isize {
        self.unattached.load(Ordering::Relaxed)
    }
}

impl Default for MemoryTracker {
    fn default() -> MemoryTracker {
        MemoryTracker::new()
    }
}
