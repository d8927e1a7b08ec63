//! Flat, globally indexed primitive tables consumed by the intersection and
//! shading kernels.
//!
//! Geometry ids attached to the library use two slots per object: `2i` for an
//! object's triangles (or its instance), `2i + 1` for its curves. The packed
//! `prim_type` integers keep the curve segment in the high bits; everything
//! outside this module works with the decoded [`PrimitiveRef`] instead.

use crate::backend::RayHit;

pub const PRIMITIVE_NONE: u32 = 0;
pub const PRIMITIVE_TRIANGLE: u32 = 1;
pub const PRIMITIVE_CURVE: u32 = 2;

/// Low bits hold the primitive kind, the rest the curve segment.
pub const PRIMITIVE_TYPE_BITS: u32 = 4;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PrimitiveRef {
    Triangle,
    /// Segment index within the owning curve.
    CurveSegment(u32),
}

impl PrimitiveRef {
    pub fn packed(self) -> u32 {
        match self {
            PrimitiveRef::Triangle => PRIMITIVE_TRIANGLE,
            PrimitiveRef::CurveSegment(segment) => {
                (segment << PRIMITIVE_TYPE_BITS) | PRIMITIVE_CURVE
            }
        }
    }

    pub fn unpack(raw: u32) -> Option<PrimitiveRef> {
        match raw & ((1 << PRIMITIVE_TYPE_BITS) - 1) {
            PRIMITIVE_TRIANGLE => Some(PrimitiveRef::Triangle),
            PRIMITIVE_CURVE => Some(PrimitiveRef::CurveSegment(raw >> PRIMITIVE_TYPE_BITS)),
            _ => None,
        }
    }

    pub fn is_curve(self) -> bool {
        match self {
            PrimitiveRef::CurveSegment(_) => true,
            PrimitiveRef::Triangle => false,
        }
    }
}

/// Library geometry id carrying the object index and primitive family.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GeomId(u32);

impl GeomId {
    pub fn triangles(object: usize) -> GeomId {
        GeomId(object as u32 * 2)
    }

    pub fn curves(object: usize) -> GeomId {
        GeomId(object as u32 * 2 + 1)
    }

    /// Instances occupy the object's triangle slot.
    pub fn instance(object: usize) -> GeomId {
        GeomId::triangles(object)
    }

    pub fn from_raw(raw: u32) -> GeomId {
        GeomId(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn object(self) -> usize {
        (self.0 / 2) as usize
    }

    pub fn is_curve(self) -> bool {
        self.0 & 1 == 1
    }
}

/// Hit in renderer numbering, ready for the shading kernels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Intersection {
    pub object: usize,
    /// Global mesh-pool primitive index.
    pub prim: i32,
    pub kind: PrimitiveRef,
    pub u: f32,
    pub v: f32,
    pub t: f32,
}

/// Parallel, insertion-ordered tables with one entry per flattened primitive.
#[derive(Debug, Clone)]
pub struct Pack {
    /// Reserved top-level root marker; this adapter defers traversal to the
    /// library and never populates a CPU-side tree.
    pub root_index: i32,
    pub prim_type: Vec<u32>,
    pub prim_index: Vec<i32>,
    pub prim_object: Vec<u32>,
    pub prim_tri_index: Vec<i32>,
    pub prim_tri_verts: Vec<[[f32; 4]; 3]>,
    /// Per-object offset of its first entry in the tables above.
    pub object_node: Vec<u32>,
}

impl Pack {
    pub fn new() -> Pack {
        Pack {
            root_index: -1,
            prim_type: Vec::new(),
            prim_index: Vec::new(),
            prim_object: Vec::new(),
            prim_tri_index: Vec::new(),
            prim_tri_verts: Vec::new(),
            object_node: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.root_index = -1;
        self.prim_type.clear();
        self.prim_index.clear();
        self.prim_object.clear();
        self.prim_tri_index.clear();
        self.prim_tri_verts.clear();
        self.object_node.clear();
    }

    /// Pre-sizes the tables once so population never reallocates.
    pub fn reserve(&mut self, prims: usize, tri_verts: usize) {
        self.prim_type.reserve(prims);
        self.prim_index.reserve(prims);
        self.prim_object.reserve(prims);
        self.prim_tri_index.reserve(prims);
        self.prim_tri_verts.reserve(tri_verts);
    }

    pub fn len(&self) -> usize {
        self.prim_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prim_index.is_empty()
    }

    pub fn lengths_consistent(&self) -> bool {
        let n = self.prim_index.len();
        self.prim_type.len() == n && self.prim_object.len() == n && self.prim_tri_index.len() == n
    }

    pub fn push_triangle(&mut self, object: usize, index: usize, verts: [[f32; 4]; 3]) {
        self.prim_type.push(PrimitiveRef::Triangle.packed());
        self.prim_index.push(index as i32);
        self.prim_object.push(object as u32);
        self.prim_tri_index.push(self.prim_tri_verts.len() as i32);
        self.prim_tri_verts.push(verts);
    }

    pub fn push_curve_segment(&mut self, object: usize, curve: usize, segment: u32) {
        self.prim_type
            .push(PrimitiveRef::CurveSegment(segment).packed());
        self.prim_index.push(curve as i32);
        self.prim_object.push(object as u32);
        self.prim_tri_index.push(-1);
    }

    /// Instances keep the tables densely indexed with a placeholder entry.
    pub fn push_instance(&mut self, object: usize) {
        self.prim_type.push(PRIMITIVE_NONE);
        self.prim_index.push(-1);
        self.prim_object.push(object as u32);
        self.prim_tri_index.push(-1);
    }

    /// Converts a library hit into renderer numbering. Triangle barycentrics
    /// are remapped to `(1 - v - u, u)`; curves keep `(u, v)` as reported.
    /// Shading code depends on this exact convention.
    pub fn intersection_from_hit(&self, hit: &RayHit) -> Option<Intersection> {
        let slot = hit.user_data + hit.prim_id as usize;
        let kind = PrimitiveRef::unpack(*self.prim_type.get(slot)?)?;
        let id = GeomId::from_raw(match hit.instance_id {
            Some(instance) => instance,
            None => hit.geom_id,
        });
        let (u, v) = match kind {
            PrimitiveRef::Triangle => (1.0 - hit.v - hit.u, hit.u),
            PrimitiveRef::CurveSegment(_) => (hit.u, hit.v),
        };
        Some(Intersection {
            object: id.object(),
            prim: self.prim_index[slot],
            kind,
            u,
            v,
            t: hit.t,
        })
    }
}

impl Default for Pack {
    fn default() -> Pack {
        Pack::new()
    }
}
