use glam::Vec3;
use id_arena::Id;

use crate::scene_graph::entity::{Entity, MovableObject};
use crate::scene_graph::scene::Scene;
use crate::scene_graph::transform::Transform;

pub type ObjectId = Id<Object3D>;

pub struct Object3D {
    pub name: String,
    pub transform: Transform,
    pub attached: Vec<MovableObject>,
    pub parent_id: Option<ObjectId>,
    pub child_ids: Vec<ObjectId>,
}

impl Object3D {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attach(&mut self, object: MovableObject) {
        self.attached.push(object);
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.attached.iter().filter_map(|object| match object {
            MovableObject::Entity(entity) => Some(entity),
            MovableObject::Light(_) => None,
        })
    }

    pub fn parent<'a>(&self, scene: &'a Scene) -> Option<&'a Object3D> {
        self.parent_id.and_then(|id| scene.get_object(id))
    }

    pub fn children<'a, 'b>(&'a self, scene: &'b Scene) -> impl Iterator<Item = &'b Object3D> + 'b
    where
        'a: 'b,
    {
        self.child_ids
            .iter()
            .filter_map(move |id| scene.get_object(*id))
    }
}

impl Default for Object3D {
    fn default() -> Self {
        Self {
            name: String::new(),
            transform: Transform::from_translation(Vec3::ZERO),
            attached: Vec::new(),
            parent_id: None,
            child_ids: Vec::new(),
        }
    }
}
