use glam::*;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Display for Aabb {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (min, max) = self.points();
        write!(
            f,
            "(min: ({}, {}, {}), max: ({}, {}, {}))",
            min.x(),
            min.y(),
            min.z(),
            max.x(),
            max.y(),
            max.z(),
        )
    }
}

impl Aabb {
    pub fn new() -> Aabb {
        Aabb {
            min: [1e34; 3],
            max: [-1e34; 3],
        }
    }

    pub fn points(&self) -> (Vec3, Vec3) {
        (Vec3::from(self.min), Vec3::from(self.max))
    }

    pub fn grow(&mut self, pos: Vec3) {
        let (min, max) = self.points();

        let min = min.min(pos);
        let max = max.max(pos);

        self.min = min.into();
        self.max = max.into();
    }

    pub fn grow_bb(&mut self, aabb: &Aabb) {
        let (min, max) = aabb.points();
        self.grow(min);
        self.grow(max);
    }

    pub fn is_valid(&self) -> bool {
        self.min[0] <= self.max[0] && self.min[1] <= self.max[1] && self.min[2] <= self.max[2]
    }

    pub fn center(&self) -> Vec3 {
        let (min, max) = self.points();
        (min + max) * 0.5
    }

    pub fn transformed(&self, transform: Mat4) -> Aabb {
        let (min, max) = self.points();
        let mut result = Aabb::new();
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { min.x() } else { max.x() },
                if i & 2 == 0 { min.y() } else { max.y() },
                if i & 4 == 0 { min.z() } else { max.z() },
            );
            let corner = transform * Vec4::new(corner.x(), corner.y(), corner.z(), 1.0);
            result.grow(corner.truncate().into());
        }
        result
    }
}

impl Default for Aabb {
    fn default() -> Aabb {
        Aabb::new()
    }
}
