use std::collections::HashMap;

use id_arena::{Arena, Id};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
}

pub type MaterialId = Id<Material>;

pub struct MaterialManager {
    materials: Arena<Material>,
    materials_by_name: HashMap<String, MaterialId>,
}

impl Default for MaterialManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialManager {
    pub fn new() -> Self {
        Self {
            materials: Arena::new(),
            materials_by_name: HashMap::new(),
        }
    }

    /// Registers a material, returning the existing id if the name is already known.
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        if let Some(&id) = self.materials_by_name.get(&material.name) {
            return id;
        }

        let name = material.name.clone();
        let id = self.materials.alloc(material);
        self.materials_by_name.insert(name, id);
        id
    }

    pub fn add_named(&mut self, name: impl Into<String>) -> MaterialId {
        self.add_material(Material { name: name.into() })
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<MaterialId> {
        self.materials_by_name.get(name).copied()
    }

    pub fn resolve(&self, name: &str) -> Result<MaterialId> {
        self.get_by_name(name)
            .ok_or_else(|| Error::MaterialNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.len() == 0
    }
}
