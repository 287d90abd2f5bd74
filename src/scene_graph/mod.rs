pub mod entity;
pub mod object3d;
pub mod scene;
pub mod transform;

pub use entity::{Entity, Light, MovableObject, SceneLight, SubEntity};
pub use object3d::{Object3D, ObjectId};
pub use scene::Scene;
pub use transform::{Transform, WorldTransform};
