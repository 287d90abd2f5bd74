use glam::{Mat4, Vec3};

use crate::buffers::{IndexBufferHandle, VertexBufferHandle};
use crate::material_manager::MaterialId;
use crate::model::{IndexFormat, OperationType};
use crate::scene_graph::SceneLight;

/// Everything a backend needs to issue one indexed draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOperation {
    pub operation_type: OperationType,
    pub vertex_buffer: VertexBufferHandle,
    pub vertex_count: u32,
    pub index_buffer: IndexBufferHandle,
    pub index_format: IndexFormat,
    pub index_count: u32,
}

/// The drawable contract consumed by the render queue.
pub trait Renderable {
    fn material(&self) -> MaterialId;

    fn render_operation(&self) -> RenderOperation;

    fn world_transform(&self) -> Mat4;

    fn squared_view_depth(&self, camera_position: Vec3) -> f32;

    fn lights(&self) -> &[SceneLight];

    fn casts_shadows(&self) -> bool;
}

pub struct RenderQueue<'a> {
    renderables: Vec<Box<dyn Renderable + 'a>>,
}

impl Default for RenderQueue<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> RenderQueue<'a> {
    pub fn new() -> Self {
        Self {
            renderables: Vec::new(),
        }
    }

    pub fn add(&mut self, renderable: Box<dyn Renderable + 'a>) {
        self.renderables.push(renderable);
    }

    pub fn len(&self) -> usize {
        self.renderables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderables.is_empty()
    }

    pub fn clear(&mut self) {
        self.renderables.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &(dyn Renderable + 'a)> {
        self.renderables.iter().map(|renderable| renderable.as_ref())
    }

    /// Groups renderables sharing a material next to each other, keeping
    /// submission order within a material.
    pub fn sort_by_material(&mut self) {
        self.renderables
            .sort_by_key(|renderable| renderable.material().index());
    }

    pub fn total_index_count(&self) -> u64 {
        self.renderables
            .iter()
            .map(|renderable| renderable.render_operation().index_count as u64)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material_manager::MaterialManager;

    struct Stub {
        material: MaterialId,
        index_count: u32,
    }

    impl Renderable for Stub {
        fn material(&self) -> MaterialId {
            self.material
        }

        fn render_operation(&self) -> RenderOperation {
            RenderOperation {
                operation_type: OperationType::TriangleList,
                vertex_buffer: VertexBufferHandle(0),
                vertex_count: 3,
                index_buffer: IndexBufferHandle(0),
                index_format: IndexFormat::U16,
                index_count: self.index_count,
            }
        }

        fn world_transform(&self) -> Mat4 {
            Mat4::IDENTITY
        }

        fn squared_view_depth(&self, _camera_position: Vec3) -> f32 {
            0.0
        }

        fn lights(&self) -> &[SceneLight] {
            &[]
        }

        fn casts_shadows(&self) -> bool {
            false
        }
    }

    #[test]
    fn sorting_groups_materials_stably() {
        let mut materials = MaterialManager::new();
        let stone = materials.add_named("Stone");
        let grass = materials.add_named("Grass");

        let mut queue = RenderQueue::new();
        for (material, index_count) in [(grass, 3), (stone, 6), (grass, 9)] {
            queue.add(Box::new(Stub {
                material,
                index_count,
            }));
        }
        queue.sort_by_material();

        let order: Vec<u32> = queue
            .iter()
            .map(|renderable| renderable.render_operation().index_count)
            .collect();
        assert_eq!(order, vec![6, 3, 9]);
        assert_eq!(queue.total_index_count(), 18);
    }
}
