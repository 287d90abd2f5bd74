use crate::error::{Error, Result};
use crate::model::{IndexFormat, VertexLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBufferHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexBufferHandle(pub u32);

/// Allocates device buffers for finished geometry. Implemented by the rendering
/// backend; the batching code only ever hands it complete, immutable contents.
pub trait BufferManager {
    fn create_vertex_buffer(
        &mut self,
        label: &str,
        layout: &VertexLayout,
        vertex_count: usize,
        contents: &[u8],
    ) -> Result<VertexBufferHandle>;

    fn create_index_buffer(
        &mut self,
        label: &str,
        format: IndexFormat,
        index_count: usize,
        contents: &[u8],
    ) -> Result<IndexBufferHandle>;

    fn destroy_vertex_buffer(&mut self, handle: VertexBufferHandle);

    fn destroy_index_buffer(&mut self, handle: IndexBufferHandle);
}

#[derive(Debug, Clone)]
pub struct HostVertexBuffer {
    pub label: String,
    pub layout: VertexLayout,
    pub vertex_count: usize,
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct HostIndexBuffer {
    pub label: String,
    pub format: IndexFormat,
    pub index_count: usize,
    pub contents: Vec<u8>,
}

/// Keeps buffer contents in system memory. Used by tools and tests, and as a
/// staging area when no device is available.
#[derive(Default)]
pub struct HostBufferManager {
    vertex_buffers: Vec<Option<HostVertexBuffer>>,
    index_buffers: Vec<Option<HostIndexBuffer>>,
    free_vertex_slots: Vec<u32>,
    free_index_slots: Vec<u32>,
    // None = unlimited
    byte_budget: Option<usize>,
    bytes_in_use: usize,
}

impl HostBufferManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_byte_budget(byte_budget: usize) -> Self {
        Self {
            byte_budget: Some(byte_budget),
            ..Self::default()
        }
    }

    pub fn vertex_buffer(&self, handle: VertexBufferHandle) -> Option<&HostVertexBuffer> {
        self.vertex_buffers
            .get(handle.0 as usize)
            .and_then(Option::as_ref)
    }

    pub fn index_buffer(&self, handle: IndexBufferHandle) -> Option<&HostIndexBuffer> {
        self.index_buffers
            .get(handle.0 as usize)
            .and_then(Option::as_ref)
    }

    pub fn live_vertex_buffers(&self) -> usize {
        self.vertex_buffers.iter().flatten().count()
    }

    pub fn live_index_buffers(&self) -> usize {
        self.index_buffers.iter().flatten().count()
    }

    pub fn bytes_in_use(&self) -> usize {
        self.bytes_in_use
    }

    fn reserve(&mut self, label: &str, bytes: usize) -> Result<()> {
        if let Some(budget) = self.byte_budget {
            if self.bytes_in_use + bytes > budget {
                return Err(Error::BufferAllocation(format!(
                    "{label}: {bytes} bytes requested, {} of {budget} already in use",
                    self.bytes_in_use
                )));
            }
        }

        self.bytes_in_use += bytes;
        Ok(())
    }
}

/// Puts `buffer` into the most recently freed slot, or appends a new one.
fn store<T>(slots: &mut Vec<Option<T>>, free: &mut Vec<u32>, buffer: T) -> u32 {
    match free.pop() {
        Some(slot) => {
            slots[slot as usize] = Some(buffer);
            slot
        }
        None => {
            slots.push(Some(buffer));
            (slots.len() - 1) as u32
        }
    }
}

impl BufferManager for HostBufferManager {
    fn create_vertex_buffer(
        &mut self,
        label: &str,
        layout: &VertexLayout,
        vertex_count: usize,
        contents: &[u8],
    ) -> Result<VertexBufferHandle> {
        if contents.len() != vertex_count * layout.stride {
            return Err(Error::BufferAllocation(format!(
                "{label}: {} bytes do not hold {vertex_count} vertices of stride {}",
                contents.len(),
                layout.stride
            )));
        }

        self.reserve(label, contents.len())?;

        let buffer = HostVertexBuffer {
            label: label.to_string(),
            layout: layout.clone(),
            vertex_count,
            contents: contents.to_vec(),
        };

        let slot = store(&mut self.vertex_buffers, &mut self.free_vertex_slots, buffer);
        Ok(VertexBufferHandle(slot))
    }

    fn create_index_buffer(
        &mut self,
        label: &str,
        format: IndexFormat,
        index_count: usize,
        contents: &[u8],
    ) -> Result<IndexBufferHandle> {
        if contents.len() != index_count * format.size() {
            return Err(Error::BufferAllocation(format!(
                "{label}: {} bytes do not hold {index_count} {format:?} indices",
                contents.len()
            )));
        }

        self.reserve(label, contents.len())?;

        let buffer = HostIndexBuffer {
            label: label.to_string(),
            format,
            index_count,
            contents: contents.to_vec(),
        };

        let slot = store(&mut self.index_buffers, &mut self.free_index_slots, buffer);
        Ok(IndexBufferHandle(slot))
    }

    fn destroy_vertex_buffer(&mut self, handle: VertexBufferHandle) {
        match self
            .vertex_buffers
            .get_mut(handle.0 as usize)
            .and_then(Option::take)
        {
            Some(buffer) => {
                self.bytes_in_use -= buffer.contents.len();
                self.free_vertex_slots.push(handle.0);
            }
            None => log::warn!("Vertex buffer {:?} destroyed twice", handle),
        }
    }

    fn destroy_index_buffer(&mut self, handle: IndexBufferHandle) {
        match self
            .index_buffers
            .get_mut(handle.0 as usize)
            .and_then(Option::take)
        {
            Some(buffer) => {
                self.bytes_in_use -= buffer.contents.len();
                self.free_index_slots.push(handle.0);
            }
            None => log::warn!("Index buffer {:?} destroyed twice", handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_releases_buffers() {
        let mut buffers = HostBufferManager::new();
        let layout = VertexLayout::position_only();

        let vertices = buffers
            .create_vertex_buffer("Vertices", &layout, 2, &[0; 24])
            .unwrap();
        let indices = buffers
            .create_index_buffer("Indices", IndexFormat::U16, 3, &[0; 6])
            .unwrap();

        assert_eq!(buffers.vertex_buffer(vertices).unwrap().vertex_count, 2);
        assert_eq!(buffers.index_buffer(indices).unwrap().index_count, 3);
        assert_eq!(buffers.bytes_in_use(), 30);

        buffers.destroy_vertex_buffer(vertices);
        buffers.destroy_index_buffer(indices);
        assert_eq!(buffers.live_vertex_buffers(), 0);
        assert_eq!(buffers.live_index_buffers(), 0);
        assert_eq!(buffers.bytes_in_use(), 0);
        assert!(buffers.vertex_buffer(vertices).is_none());
    }

    #[test]
    fn destroyed_slots_are_reused() {
        let mut buffers = HostBufferManager::new();
        let layout = VertexLayout::position_only();

        for _ in 0..3 {
            let vertices = buffers
                .create_vertex_buffer("Vertices", &layout, 1, &[0; 12])
                .unwrap();
            let indices = buffers
                .create_index_buffer("Indices", IndexFormat::U16, 3, &[0; 6])
                .unwrap();

            assert_eq!(vertices, VertexBufferHandle(0));
            assert_eq!(indices, IndexBufferHandle(0));

            buffers.destroy_vertex_buffer(vertices);
            buffers.destroy_index_buffer(indices);
        }

        assert_eq!(buffers.vertex_buffers.len(), 1);
        assert_eq!(buffers.index_buffers.len(), 1);

        let kept = buffers
            .create_vertex_buffer("Kept", &layout, 1, &[0; 12])
            .unwrap();
        let added = buffers
            .create_vertex_buffer("Added", &layout, 1, &[0; 12])
            .unwrap();
        assert_eq!(kept, VertexBufferHandle(0));
        assert_eq!(added, VertexBufferHandle(1));
        assert_eq!(buffers.vertex_buffer(kept).unwrap().label, "Kept");
    }

    #[test]
    fn budget_is_enforced() {
        let mut buffers = HostBufferManager::with_byte_budget(16);
        let layout = VertexLayout::position_only();

        assert!(buffers
            .create_vertex_buffer("Small", &layout, 1, &[0; 12])
            .is_ok());
        assert!(matches!(
            buffers.create_vertex_buffer("Too big", &layout, 1, &[0; 12]),
            Err(Error::BufferAllocation(_))
        ));
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let mut buffers = HostBufferManager::new();
        assert!(buffers
            .create_index_buffer("Indices", IndexFormat::U32, 2, &[0; 6])
            .is_err());
    }
}
