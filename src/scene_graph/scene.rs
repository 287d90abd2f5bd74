use glam::{Mat4, Quat, Vec3};
use id_arena::Arena;

use crate::scene_graph::entity::{MovableObject, SceneLight};
use crate::scene_graph::object3d::{Object3D, ObjectId};
use crate::scene_graph::transform::Transform;

pub struct Scene {
    pub objects: Arena<Object3D>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Arena::new(),
        }
    }

    pub fn add_object(&mut self, object: Object3D) -> ObjectId {
        self.objects.alloc(object)
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(id)
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Option<&mut Object3D> {
        self.objects.get_mut(id)
    }

    pub fn get_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, object)| object.name == name)
            .map(|(id, _)| id)
    }

    /// Updates all object transforms in hierarchical order
    pub fn update_transforms(&self) {
        let root_objects = self
            .objects
            .iter()
            .filter(|(_, object)| object.parent_id.is_none())
            .map(|(id, _)| id);

        for root_id in root_objects {
            self.update_object_transform_recursive(root_id, Mat4::IDENTITY, false);
        }
    }

    fn update_object_transform_recursive(
        &self,
        object_id: ObjectId,
        parent_world_matrix: Mat4,
        parent_changed: bool,
    ) {
        if let Some(object) = self.objects.get(object_id) {
            // Reading the local matrix refreshes it and flags the world matrix if it was stale
            let local_matrix = *object.transform.get_local_matrix();
            let changed = parent_changed || object.transform.is_world_dirty();

            if changed {
                object
                    .transform
                    .set_world_matrix(parent_world_matrix * local_matrix);
            }

            let world_matrix = *object.transform.get_world_matrix();
            for &child_id in &object.child_ids {
                self.update_object_transform_recursive(child_id, world_matrix, changed);
            }
        }
    }

    /// Invalidates world transforms for an object and all its descendants
    pub fn invalidate_object_hierarchy(&self, object_id: ObjectId) {
        if let Some(object) = self.objects.get(object_id) {
            object.transform.invalidate_world();

            for &child_id in &object.child_ids {
                self.invalidate_object_hierarchy(child_id);
            }
        }
    }

    /// Sets the parent of an object and updates child relationships
    pub fn set_object_parent(&mut self, child_id: ObjectId, new_parent_id: Option<ObjectId>) {
        if let Some(child) = self.objects.get(child_id) {
            if let Some(old_parent_id) = child.parent_id {
                if let Some(old_parent) = self.objects.get_mut(old_parent_id) {
                    old_parent.child_ids.retain(|&id| id != child_id);
                }
            }
        }

        if let Some(child) = self.objects.get_mut(child_id) {
            child.parent_id = new_parent_id;

            if let Some(new_parent_id) = new_parent_id {
                if let Some(new_parent) = self.objects.get_mut(new_parent_id) {
                    new_parent.child_ids.push(child_id);
                }
            }
        }

        self.invalidate_object_hierarchy(child_id);
    }

    pub fn set_object_transform(
        &mut self,
        object_id: ObjectId,
        translation: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_transform(translation, rotation, scale);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    pub fn get_object_transform(&self, object_id: ObjectId) -> Option<&Transform> {
        self.objects.get(object_id).map(|object| &object.transform)
    }

    /// Every attached light, positioned at its node's world translation.
    pub fn lights(&self) -> Vec<SceneLight> {
        self.update_transforms();

        self.objects
            .iter()
            .flat_map(|(_, object)| {
                let position = object.transform.world_transform().position;
                object.attached.iter().filter_map(move |attached| match attached {
                    MovableObject::Light(light) => Some(SceneLight {
                        name: light.name.clone(),
                        position,
                        range: light.range,
                    }),
                    MovableObject::Entity(_) => None,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_graph::entity::Light;

    #[test]
    fn child_inherits_parent_transform() {
        let mut scene = Scene::new();
        let parent = scene.add_object(Object3D::new("Parent"));
        let child = scene.add_object(Object3D::new("Child"));
        scene.set_object_parent(child, Some(parent));

        scene.set_object_transform(parent, Vec3::new(10.0, 0.0, 0.0), Quat::IDENTITY, Vec3::splat(2.0));
        scene.set_object_transform(child, Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE);
        scene.update_transforms();

        let world = scene.get_object_transform(child).unwrap().world_transform();
        assert!(world.position.abs_diff_eq(Vec3::new(12.0, 0.0, 0.0), 1e-5));
        assert!(world.scale.abs_diff_eq(Vec3::splat(2.0), 1e-5));

        let child_object = scene.get_object(child).unwrap();
        assert_eq!(child_object.parent(&scene).map(|p| p.name.as_str()), Some("Parent"));

        let parent_object = scene.get_object(parent).unwrap();
        let children: Vec<&str> = parent_object.children(&scene).map(|c| c.name.as_str()).collect();
        assert_eq!(children, vec!["Child"]);
    }

    #[test]
    fn moving_parent_updates_children() {
        let mut scene = Scene::new();
        let parent = scene.add_object(Object3D::new("Parent"));
        let child = scene.add_object(Object3D::new("Child"));
        scene.set_object_parent(child, Some(parent));
        scene.update_transforms();

        scene.set_object_transform(parent, Vec3::new(0.0, 5.0, 0.0), Quat::IDENTITY, Vec3::ONE);
        scene.update_transforms();

        let world = scene.get_object_transform(child).unwrap().world_transform();
        assert!(world.position.abs_diff_eq(Vec3::new(0.0, 5.0, 0.0), 1e-5));
    }

    #[test]
    fn lights_take_node_position() {
        let mut scene = Scene::new();
        let mut node = Object3D::new("Lamp post");
        node.transform.set_translation(Vec3::new(3.0, 4.0, 5.0));
        node.attach(MovableObject::Light(Light {
            name: "Lamp".to_string(),
            range: 20.0,
        }));
        scene.add_object(node);

        let lights = scene.lights();
        assert_eq!(lights.len(), 1);
        assert!(lights[0].position.abs_diff_eq(Vec3::new(3.0, 4.0, 5.0), 1e-5));
        assert!(scene.get_object_by_name("Lamp post").is_some());
    }
}
