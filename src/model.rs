use std::mem::offset_of;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::error::{Error, Result};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, tex_coords: Vec2) -> Self {
        Self {
            position,
            normal,
            tex_coords,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
    Position,
    Normal,
    Tangent,
    TexCoord(u8),
    Colour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float1,
    Float2,
    Float3,
    Float4,
    Unorm8x4,
}

impl VertexFormat {
    pub fn size(self) -> usize {
        match self {
            Self::Float1 => 4,
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
            Self::Unorm8x4 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexElement {
    pub semantic: VertexSemantic,
    pub format: VertexFormat,
    pub offset: usize,
}

/// Interleaved single-stream vertex declaration. Two buffers can only be merged
/// when their layouts compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    pub stride: usize,
    pub elements: Vec<VertexElement>,
}

impl VertexLayout {
    /// Layout of [`Vertex`].
    pub fn standard() -> Self {
        Self {
            stride: std::mem::size_of::<Vertex>(),
            elements: vec![
                VertexElement {
                    semantic: VertexSemantic::Position,
                    format: VertexFormat::Float3,
                    offset: offset_of!(Vertex, position),
                },
                VertexElement {
                    semantic: VertexSemantic::Normal,
                    format: VertexFormat::Float3,
                    offset: offset_of!(Vertex, normal),
                },
                VertexElement {
                    semantic: VertexSemantic::TexCoord(0),
                    format: VertexFormat::Float2,
                    offset: offset_of!(Vertex, tex_coords),
                },
            ],
        }
    }

    pub fn position_only() -> Self {
        Self {
            stride: VertexFormat::Float3.size(),
            elements: vec![VertexElement {
                semantic: VertexSemantic::Position,
                format: VertexFormat::Float3,
                offset: 0,
            }],
        }
    }

    /// Builds a tightly packed layout from `(semantic, format)` pairs in order.
    pub fn packed(elements: &[(VertexSemantic, VertexFormat)]) -> Self {
        let mut offset = 0;
        let elements = elements
            .iter()
            .map(|&(semantic, format)| {
                let element = VertexElement {
                    semantic,
                    format,
                    offset,
                };
                offset += format.size();
                element
            })
            .collect();

        Self {
            stride: offset,
            elements,
        }
    }

    pub fn find(&self, semantic: VertexSemantic) -> Option<&VertexElement> {
        self.elements
            .iter()
            .find(|element| element.semantic == semantic)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VertexData {
    layout: VertexLayout,
    bytes: Vec<u8>,
}

impl VertexData {
    pub fn new(layout: VertexLayout, bytes: Vec<u8>) -> Result<Self> {
        if layout.stride == 0 || bytes.len() % layout.stride != 0 {
            return Err(Error::MisalignedVertexData {
                len: bytes.len(),
                stride: layout.stride,
            });
        }

        if let Some(element) = layout
            .elements
            .iter()
            .find(|element| element.offset + element.format.size() > layout.stride)
        {
            return Err(Error::ElementOutsideStride {
                semantic: element.semantic,
                offset: element.offset,
                size: element.format.size(),
                stride: layout.stride,
            });
        }

        Ok(Self { layout, bytes })
    }

    pub fn from_vertices(vertices: &[Vertex]) -> Self {
        Self {
            layout: VertexLayout::standard(),
            bytes: bytemuck::cast_slice(vertices).to_vec(),
        }
    }

    pub fn from_positions(positions: &[Vec3]) -> Self {
        Self {
            layout: VertexLayout::position_only(),
            bytes: bytemuck::cast_slice(positions).to_vec(),
        }
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn vertex_count(&self) -> usize {
        self.bytes.len() / self.layout.stride
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn vertex(&self, index: usize) -> &[u8] {
        let start = index * self.layout.stride;
        &self.bytes[start..start + self.layout.stride]
    }

    /// Element used to read `semantic` as a 3-component vector.
    pub fn vec3_element(&self, semantic: VertexSemantic) -> Result<VertexElement> {
        let element = *self
            .layout
            .find(semantic)
            .ok_or(Error::MissingElement(semantic))?;

        match element.format {
            VertexFormat::Float3 | VertexFormat::Float4 => Ok(element),
            format => Err(Error::UnsupportedFormat { semantic, format }),
        }
    }

    pub fn positions(&self) -> Result<impl Iterator<Item = Vec3> + '_> {
        let element = self.vec3_element(VertexSemantic::Position)?;
        Ok((0..self.vertex_count()).map(move |index| read_vec3(self.vertex(index), &element)))
    }

    /// Copies the vertices at `old_indices`, in order, into a new buffer.
    pub fn gather(&self, old_indices: impl IntoIterator<Item = usize>) -> VertexData {
        let mut bytes = Vec::new();
        for index in old_indices {
            bytes.extend_from_slice(self.vertex(index));
        }

        VertexData {
            layout: self.layout.clone(),
            bytes,
        }
    }
}

pub(crate) fn read_vec3(vertex: &[u8], element: &VertexElement) -> Vec3 {
    let start = element.offset;
    bytemuck::pod_read_unaligned(&vertex[start..start + VertexFormat::Float3.size()])
}

pub(crate) fn write_vec3(vertex: &mut [u8], element: &VertexElement, value: Vec3) {
    let start = element.offset;
    vertex[start..start + VertexFormat::Float3.size()].copy_from_slice(bytemuck::bytes_of(&value));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    #[default]
    U16,
    U32,
}

impl IndexFormat {
    pub fn size(self) -> usize {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexData {
    pub fn count(&self) -> usize {
        match self {
            Self::U16(indices) => indices.len(),
            Self::U32(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn format(&self) -> IndexFormat {
        match self {
            Self::U16(_) => IndexFormat::U16,
            Self::U32(_) => IndexFormat::U32,
        }
    }

    pub fn get(&self, position: usize) -> Option<u32> {
        match self {
            Self::U16(indices) => indices.get(position).map(|&index| index as u32),
            Self::U32(indices) => indices.get(position).copied(),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = u32> + '_> {
        match self {
            Self::U16(indices) => Box::new(indices.iter().map(|&index| index as u32)),
            Self::U32(indices) => Box::new(indices.iter().copied()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::U16(indices) => bytemuck::cast_slice(indices),
            Self::U32(indices) => bytemuck::cast_slice(indices),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperationType {
    PointList,
    LineList,
    #[default]
    TriangleList,
}

impl OperationType {
    pub fn vertices_per_primitive(self) -> usize {
        match self {
            Self::PointList => 1,
            Self::LineList => 2,
            Self::TriangleList => 3,
        }
    }
}

pub struct SubMesh {
    pub material_name: String,
    pub operation_type: OperationType,
    /// `None` means the submesh indexes into the mesh's shared vertex data.
    pub vertex_data: Option<Arc<VertexData>>,
    pub index_data: Arc<IndexData>,
    /// Reduced index lists for LOD levels 1 and up, indexing the same vertices as LOD 0.
    pub lod_index_data: Vec<Arc<IndexData>>,
}

impl SubMesh {
    pub fn new(
        material_name: impl Into<String>,
        vertex_data: VertexData,
        index_data: IndexData,
    ) -> Self {
        Self {
            material_name: material_name.into(),
            operation_type: OperationType::TriangleList,
            vertex_data: Some(Arc::new(vertex_data)),
            index_data: Arc::new(index_data),
            lod_index_data: Vec::new(),
        }
    }

    pub fn shared(material_name: impl Into<String>, index_data: IndexData) -> Self {
        Self {
            material_name: material_name.into(),
            operation_type: OperationType::TriangleList,
            vertex_data: None,
            index_data: Arc::new(index_data),
            lod_index_data: Vec::new(),
        }
    }

    pub fn with_operation_type(mut self, operation_type: OperationType) -> Self {
        self.operation_type = operation_type;
        self
    }

    pub fn with_lod_indices(mut self, index_data: IndexData) -> Self {
        self.lod_index_data.push(Arc::new(index_data));
        self
    }

    pub fn uses_shared_vertices(&self) -> bool {
        self.vertex_data.is_none()
    }

    /// Index list for `lod`, falling back to the lowest detail level available.
    pub fn index_data_for_lod(&self, lod: usize) -> &Arc<IndexData> {
        if lod == 0 {
            return &self.index_data;
        }

        self.lod_index_data
            .get(lod - 1)
            .or_else(|| self.lod_index_data.last())
            .unwrap_or(&self.index_data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshLodUsage {
    /// Camera distance from which this level is used.
    pub from_depth: f32,
}

impl MeshLodUsage {
    pub fn from_depth_squared(&self) -> f32 {
        self.from_depth * self.from_depth
    }
}

pub struct Mesh {
    pub name: String,
    pub shared_vertex_data: Option<Arc<VertexData>>,
    pub submeshes: Vec<SubMesh>,
    /// Usages for LOD levels 1 and up; level 0 is always active from distance 0.
    pub lod_usages: Vec<MeshLodUsage>,
    pub lod_manual: bool,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared_vertex_data: None,
            submeshes: Vec::new(),
            lod_usages: Vec::new(),
            lod_manual: false,
        }
    }

    /// A mesh with a single submesh owning its vertices.
    pub fn single(
        name: impl Into<String>,
        material_name: impl Into<String>,
        vertex_data: VertexData,
        index_data: IndexData,
    ) -> Self {
        let mut mesh = Self::new(name);
        mesh.submeshes
            .push(SubMesh::new(material_name, vertex_data, index_data));
        mesh
    }

    pub fn with_shared_vertices(mut self, vertex_data: VertexData) -> Self {
        self.shared_vertex_data = Some(Arc::new(vertex_data));
        self
    }

    pub fn with_submesh(mut self, submesh: SubMesh) -> Self {
        self.submeshes.push(submesh);
        self
    }

    pub fn with_lod_level(mut self, from_depth: f32) -> Self {
        self.lod_usages.push(MeshLodUsage { from_depth });
        self
    }

    pub fn num_lod_levels(&self) -> usize {
        1 + self.lod_usages.len()
    }

    pub fn lod_usage(&self, level: usize) -> Option<MeshLodUsage> {
        match level {
            0 => Some(MeshLodUsage { from_depth: 0.0 }),
            level => self.lod_usages.get(level - 1).copied(),
        }
    }

    /// Vertex data a submesh reads from, private or shared.
    pub fn submesh_vertex_data(&self, submesh_index: usize) -> Result<&Arc<VertexData>> {
        let missing = || Error::MissingVertexData {
            mesh: self.name.clone(),
            submesh: submesh_index,
        };

        let submesh = self.submeshes.get(submesh_index).ok_or_else(missing)?;
        submesh
            .vertex_data
            .as_ref()
            .or(self.shared_vertex_data.as_ref())
            .ok_or_else(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_layout_matches_vertex() {
        let layout = VertexLayout::standard();
        assert_eq!(layout.stride, 32);
        assert_eq!(layout.find(VertexSemantic::Normal).map(|e| e.offset), Some(12));
        assert_eq!(
            layout.find(VertexSemantic::TexCoord(0)).map(|e| e.offset),
            Some(24)
        );
        assert!(layout.find(VertexSemantic::Tangent).is_none());
    }

    #[test]
    fn packed_layout_offsets() {
        let layout = VertexLayout::packed(&[
            (VertexSemantic::Position, VertexFormat::Float3),
            (VertexSemantic::Colour, VertexFormat::Unorm8x4),
            (VertexSemantic::Tangent, VertexFormat::Float4),
        ]);

        assert_eq!(layout.stride, 32);
        assert_eq!(layout.elements[2].offset, 16);
    }

    #[test]
    fn reads_positions_from_interleaved_bytes() {
        let data = VertexData::from_vertices(&[
            Vertex::new(Vec3::new(1.0, 2.0, 3.0), Vec3::Y, Vec2::ZERO),
            Vertex::new(Vec3::new(-4.0, 5.0, 6.0), Vec3::Y, Vec2::ONE),
        ]);

        assert_eq!(data.vertex_count(), 2);
        let positions: Vec<Vec3> = data.positions().unwrap().collect();
        assert_eq!(positions, vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(-4.0, 5.0, 6.0)]);
    }

    #[test]
    fn rejects_misaligned_bytes() {
        let result = VertexData::new(VertexLayout::position_only(), vec![0; 13]);
        assert!(matches!(
            result,
            Err(Error::MisalignedVertexData { len: 13, stride: 12 })
        ));
    }

    #[test]
    fn rejects_elements_past_the_stride() {
        let layout = VertexLayout {
            stride: 12,
            elements: vec![VertexElement {
                semantic: VertexSemantic::Position,
                format: VertexFormat::Float3,
                offset: 4,
            }],
        };

        let result = VertexData::new(layout, vec![0; 24]);
        assert!(matches!(
            result,
            Err(Error::ElementOutsideStride {
                semantic: VertexSemantic::Position,
                offset: 4,
                size: 12,
                stride: 12,
            })
        ));
    }

    #[test]
    fn positions_require_float_format() {
        let layout = VertexLayout::packed(&[(VertexSemantic::Position, VertexFormat::Float2)]);
        let data = VertexData::new(layout, vec![0; 16]).unwrap();
        assert!(matches!(
            data.positions().err(),
            Some(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn lod_index_fallback() {
        let submesh = SubMesh::new(
            "Stone",
            VertexData::from_positions(&[Vec3::ZERO; 3]),
            IndexData::U16(vec![0, 1, 2]),
        )
        .with_lod_indices(IndexData::U16(vec![0, 0, 0]));

        assert_eq!(submesh.index_data_for_lod(0).count(), 3);
        assert_eq!(submesh.index_data_for_lod(1).get(1), Some(0));
        assert_eq!(submesh.index_data_for_lod(4).get(1), Some(0));
    }

    #[test]
    fn shared_vertex_lookup() {
        let mesh = Mesh::new("Pillar")
            .with_shared_vertices(VertexData::from_positions(&[Vec3::ZERO; 4]))
            .with_submesh(SubMesh::shared("Stone", IndexData::U16(vec![0, 1, 2])));

        assert_eq!(mesh.submesh_vertex_data(0).unwrap().vertex_count(), 4);
        assert!(mesh.submesh_vertex_data(1).is_err());
        assert_eq!(mesh.num_lod_levels(), 1);
    }
}
