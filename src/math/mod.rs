pub mod bounds;
pub mod frustum;
pub mod plane;

pub use bounds::{BoundingSphere, AABB};
pub use frustum::Frustum;
pub use plane::Plane;
