pub mod aabb;
pub mod objects;
pub mod scene;

mod utils;

pub use aabb::*;
pub use objects::*;
pub use scene::*;
pub use utils::*;
