use crate::error::Result;
use crate::mesh_manager::{MeshId, MeshManager};

#[derive(Debug, Clone)]
pub struct SubEntity {
    pub material_name: String,
}

/// A placeable instance of a mesh with its own choice of material per submesh.
#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub mesh_id: MeshId,
    pub sub_entities: Vec<SubEntity>,
}

impl Entity {
    pub fn new(name: impl Into<String>, mesh_id: MeshId, meshes: &MeshManager) -> Result<Self> {
        let mesh = meshes.get(mesh_id)?;
        let sub_entities = mesh
            .submeshes
            .iter()
            .map(|submesh| SubEntity {
                material_name: submesh.material_name.clone(),
            })
            .collect();

        Ok(Self {
            name: name.into(),
            mesh_id,
            sub_entities,
        })
    }

    /// Overrides the material of every sub-entity.
    pub fn set_material_name(&mut self, material_name: &str) {
        for sub_entity in &mut self.sub_entities {
            sub_entity.material_name = material_name.to_string();
        }
    }
}

#[derive(Debug, Clone)]
pub struct Light {
    pub name: String,
    pub range: f32,
}

/// A light resolved to world space by the scene it is attached in.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneLight {
    pub name: String,
    pub position: glam::Vec3,
    pub range: f32,
}

#[derive(Debug, Clone)]
pub enum MovableObject {
    Entity(Entity),
    Light(Light),
}
