use std::collections::HashMap;

use id_arena::{Arena, Id};

use crate::error::{Error, Result};
use crate::model::Mesh;

pub type MeshId = Id<Mesh>;

/// Owns loaded meshes. Entities refer to meshes by id, so one mesh can back any
/// number of placed instances.
pub struct MeshManager {
    meshes: Arena<Mesh>,
    meshes_by_name: HashMap<String, MeshId>,
}

impl Default for MeshManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshManager {
    pub fn new() -> Self {
        Self {
            meshes: Arena::new(),
            meshes_by_name: HashMap::new(),
        }
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        let name = mesh.name.clone();
        let id = self.meshes.alloc(mesh);
        self.meshes_by_name.insert(name, id);
        id
    }

    pub fn get(&self, id: MeshId) -> Result<&Mesh> {
        self.meshes.get(id).ok_or(Error::UnknownMesh)
    }

    pub fn get_by_name(&self, name: &str) -> Option<MeshId> {
        self.meshes_by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeshId, &Mesh)> {
        self.meshes.iter()
    }
}
