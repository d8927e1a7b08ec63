//! Per-hit filter callbacks installed on every geometry.
//!
//! The library invokes these once per candidate hit during traversal; the
//! context carries the ray-kind specific accumulation state. Rejecting a hit
//! tells the library to keep searching.

use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::backend::{FilterDecision, FilterFn, RayHit};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RecordedHit {
    pub geom_id: u32,
    pub prim_id: u32,
    pub t: f32,
}

impl RecordedHit {
    fn of(hit: &RayHit) -> RecordedHit {
        RecordedHit {
            geom_id: hit.geom_id,
            prim_id: hit.prim_id,
            t: hit.t,
        }
    }
}

/// Ray-kind specific traversal state, one variant per ray semantics.
pub enum IntersectContext {
    /// Closest-hit query; the first accepted hit wins.
    Regular,
    /// Shadow ray accumulating every blocker, with duplicate suppression for
    /// hits the library reports twice.
    ShadowAll {
        hits: Vec<RecordedHit>,
        max_hits: usize,
    },
    /// Subsurface entry/exit recording with reservoir sampling once the hit
    /// list is full.
    SubsurfaceRecord {
        hits: Vec<RecordedHit>,
        max_hits: usize,
        num_seen: u32,
        rng: SmallRng,
    },
    /// Volume stepping: record everything, never terminate early.
    VolumeAll { hits: Vec<RecordedHit> },
}

impl IntersectContext {
    pub fn regular() -> IntersectContext {
        IntersectContext::Regular
    }

    pub fn shadow_all(max_hits: usize) -> IntersectContext {
        IntersectContext::ShadowAll {
            hits: Vec::with_capacity(max_hits),
            max_hits,
        }
    }

    pub fn subsurface(max_hits: usize, seed: u64) -> IntersectContext {
        IntersectContext::SubsurfaceRecord {
            hits: Vec::with_capacity(max_hits),
            max_hits,
            num_seen: 0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn volume_all() -> IntersectContext {
        IntersectContext::VolumeAll { hits: Vec::new() }
    }

    pub fn hits(&self) -> &[RecordedHit] {
        match self {
            IntersectContext::Regular => &[],
            IntersectContext::ShadowAll { hits, .. } => hits,
            IntersectContext::SubsurfaceRecord { hits, .. } => hits,
            IntersectContext::VolumeAll { hits } => hits,
        }
    }
}

/// Renderer policy hooks for the pieces whose exact behavior is tunable: the
/// hair backface test and the reservoir replacement rule.
#[derive(Clone)]
pub struct FilterPolicy {
    /// True when a hair hit should be discarded as backfacing.
    pub cull_backfacing_hair: Arc<dyn Fn(&RayHit) -> bool + Send + Sync>,
    /// Reservoir slot a new subsurface hit replaces once the list is full;
    /// `None` drops the hit.
    pub reservoir_slot: Arc<dyn Fn(&mut SmallRng, u32, usize) -> Option<usize> + Send + Sync>,
}

impl Default for FilterPolicy {
    fn default() -> FilterPolicy {
        FilterPolicy {
            cull_backfacing_hair: Arc::new(|hit| {
                let d = hit.ray_dir;
                let n = hit.ng;
                d[0] * n[0] + d[1] * n[1] + d[2] * n[2] > 0.0
            }),
            // uniform reservoir: keep the new hit with probability
            // max_hits / num_seen
            reservoir_slot: Arc::new(|rng, num_seen, max_hits| {
                let slot = rng.gen_range(0, num_seen) as usize;
                if slot < max_hits {
                    Some(slot)
                } else {
                    None
                }
            }),
        }
    }
}

fn filter_hit(policy: &FilterPolicy, is_hair: bool, hit: &RayHit, context: &mut IntersectContext) -> FilterDecision {
    if is_hair && (policy.cull_backfacing_hair)(hit) {
        return FilterDecision::Reject;
    }
    match context {
        IntersectContext::Regular => FilterDecision::Accept,
        IntersectContext::ShadowAll { hits, max_hits } => {
            let duplicate = hits
                .iter()
                .any(|h| h.geom_id == hit.geom_id && h.prim_id == hit.prim_id && h.t == hit.t);
            if duplicate {
                return FilterDecision::Reject;
            }
            hits.push(RecordedHit::of(hit));
            if hits.len() >= *max_hits {
                // enough blockers, let the traversal terminate
                FilterDecision::Accept
            } else {
                FilterDecision::Reject
            }
        }
        IntersectContext::SubsurfaceRecord {
            hits,
            max_hits,
            num_seen,
            rng,
        } => {
            *num_seen += 1;
            if hits.len() < *max_hits {
                hits.push(RecordedHit::of(hit));
            } else if let Some(slot) = (policy.reservoir_slot)(rng, *num_seen, *max_hits) {
                hits[slot] = RecordedHit::of(hit);
            }
            FilterDecision::Reject
        }
        IntersectContext::VolumeAll { hits } => {
            hits.push(RecordedHit::of(hit));
            FilterDecision::Reject
        }
    }
}

pub fn intersect_filter(policy: FilterPolicy, is_hair: bool) -> FilterFn {
    Arc::new(move |hit, context| filter_hit(&policy, is_hair, hit, context))
}

pub fn occluded_filter(policy: FilterPolicy, is_hair: bool) -> FilterFn {
    Arc::new(move |hit, context| filter_hit(&policy, is_hair, hit, context))
}
