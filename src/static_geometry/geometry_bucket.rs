use std::collections::HashMap;

use glam::{Mat4, Vec3};
use itertools::Itertools;
use log::trace;

use crate::buffers::{BufferManager, IndexBufferHandle, VertexBufferHandle};
use crate::error::{Error, Result};
use crate::material_manager::MaterialId;
use crate::math::AABB;
use crate::model::{
    read_vec3, write_vec3, IndexData, IndexFormat, OperationType, VertexData, VertexElement,
    VertexLayout, VertexSemantic,
};
use crate::render_queue::{RenderOperation, Renderable};
use crate::scene_graph::{SceneLight, WorldTransform};
use crate::static_geometry::queued::QueuedGeometry;

/// Geometry can only share a buffer when both the vertex layout and primitive type match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeometryFormat {
    pub layout: VertexLayout,
    pub operation_type: OperationType,
}

impl GeometryFormat {
    pub(crate) fn of(queued: &QueuedGeometry) -> Self {
        Self {
            layout: queued.geometry.vertex_data.layout().clone(),
            operation_type: queued.operation_type,
        }
    }
}

/// Elements rewritten when a vertex is moved into world space.
struct BakeElements {
    position: VertexElement,
    normal: Option<VertexElement>,
    tangent: Option<VertexElement>,
}

impl BakeElements {
    fn resolve(vertex_data: &VertexData) -> Result<Self> {
        let optional = |semantic| match vertex_data.layout().find(semantic) {
            Some(_) => vertex_data.vec3_element(semantic).map(Some),
            None => Ok(None),
        };

        Ok(Self {
            position: vertex_data.vec3_element(VertexSemantic::Position)?,
            normal: optional(VertexSemantic::Normal)?,
            tangent: optional(VertexSemantic::Tangent)?,
        })
    }

    /// Returns the baked position.
    fn bake(&self, vertex: &mut [u8], transform: &WorldTransform) -> Vec3 {
        let position = transform.transform_point(read_vec3(vertex, &self.position));
        write_vec3(vertex, &self.position, position);

        if let Some(normal) = &self.normal {
            let baked = transform.transform_normal(read_vec3(vertex, normal));
            write_vec3(vertex, normal, baked);
        }

        // Only xyz is rewritten, so a 4-component tangent keeps its handedness
        if let Some(tangent) = &self.tangent {
            let baked = transform.transform_tangent(read_vec3(vertex, tangent));
            write_vec3(vertex, tangent, baked);
        }

        position
    }
}

fn check_whole_primitives(index_count: usize, operation_type: OperationType) -> Result<()> {
    let per_primitive = operation_type.vertices_per_primitive();
    if index_count % per_primitive != 0 {
        return Err(Error::IncompletePrimitive {
            count: index_count,
            per_primitive,
        });
    }

    Ok(())
}

/// Accumulates baked geometry until it is uploaded as one [`GeometryBucket`].
pub(crate) struct GeometryBucketBuilder {
    format: GeometryFormat,
    vertices: Vec<u8>,
    vertex_count: usize,
    indices: Vec<u16>,
    bounds: AABB,
}

impl GeometryBucketBuilder {
    pub fn new(format: GeometryFormat) -> Self {
        Self {
            format,
            vertices: Vec::new(),
            vertex_count: 0,
            indices: Vec::new(),
            bounds: AABB::NULL,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }

    pub fn fits(&self, vertex_count: usize, max_vertices: usize) -> bool {
        self.vertex_count + vertex_count <= max_vertices
    }

    /// Appends a whole submesh. The caller makes sure its vertices fit.
    pub fn append(&mut self, queued: &QueuedGeometry) -> Result<()> {
        let vertex_data = &queued.geometry.vertex_data;
        let index_data = &queued.geometry.index_data;
        let vertex_count = vertex_data.vertex_count();

        check_whole_primitives(index_data.count(), queued.operation_type)?;
        if let Some(index) = index_data.iter().find(|&index| index as usize >= vertex_count) {
            return Err(Error::IndexOutOfRange {
                index,
                vertex_count,
            });
        }

        let elements = BakeElements::resolve(vertex_data)?;
        let base = self.vertex_count;
        for index in 0..vertex_count {
            self.push_vertex(vertex_data, index, &elements, &queued.transform);
        }

        self.indices
            .extend(index_data.iter().map(|index| (base + index as usize) as u16));

        Ok(())
    }

    /// Appends a submesh too large for any single bucket, one primitive at a time.
    /// Completed buckets are handed to `emit` whenever the next primitive would not fit.
    pub fn append_primitives(
        mut self,
        queued: &QueuedGeometry,
        max_vertices: usize,
        mut emit: impl FnMut(GeometryBucketBuilder) -> Result<()>,
    ) -> Result<GeometryBucketBuilder> {
        let vertex_data = &queued.geometry.vertex_data;
        let index_data = &queued.geometry.index_data;
        let vertex_count = vertex_data.vertex_count();
        let per_primitive = queued.operation_type.vertices_per_primitive();

        check_whole_primitives(index_data.count(), queued.operation_type)?;
        let elements = BakeElements::resolve(vertex_data)?;

        // Source vertex -> position in the bucket being filled
        let mut remap: HashMap<u32, u16> = HashMap::new();
        for primitive in &index_data.iter().chunks(per_primitive) {
            let primitive: Vec<u32> = primitive.collect();

            if let Some(&index) = primitive.iter().find(|&&index| index as usize >= vertex_count) {
                return Err(Error::IndexOutOfRange {
                    index,
                    vertex_count,
                });
            }

            let new_vertices = primitive
                .iter()
                .unique()
                .filter(|&&index| !remap.contains_key(&index))
                .count();
            if !self.fits(new_vertices, max_vertices) {
                let format = self.format.clone();
                emit(std::mem::replace(&mut self, GeometryBucketBuilder::new(format)))?;
                remap.clear();
            }

            for index in primitive {
                let local = match remap.get(&index) {
                    Some(&local) => local,
                    None => {
                        let local = self.push_vertex(
                            vertex_data,
                            index as usize,
                            &elements,
                            &queued.transform,
                        );
                        remap.insert(index, local);
                        local
                    }
                };
                self.indices.push(local);
            }
        }

        Ok(self)
    }

    fn push_vertex(
        &mut self,
        vertex_data: &VertexData,
        index: usize,
        elements: &BakeElements,
        transform: &WorldTransform,
    ) -> u16 {
        let start = self.vertices.len();
        self.vertices.extend_from_slice(vertex_data.vertex(index));
        let position = elements.bake(&mut self.vertices[start..], transform);
        self.bounds.extend(position);

        let local = self.vertex_count as u16;
        self.vertex_count += 1;
        local
    }

    pub fn finish(self, label: &str, buffers: &mut dyn BufferManager) -> Result<GeometryBucket> {
        let vertex_data = VertexData::new(self.format.layout.clone(), self.vertices)?;
        let index_data = IndexData::U16(self.indices);

        trace!(
            "Uploading {}: {} vertices, {} indices",
            label,
            vertex_data.vertex_count(),
            index_data.count()
        );

        let vertex_buffer = buffers.create_vertex_buffer(
            &format!("{label} vertices"),
            vertex_data.layout(),
            vertex_data.vertex_count(),
            vertex_data.bytes(),
        )?;

        let index_buffer = match buffers.create_index_buffer(
            &format!("{label} indices"),
            IndexFormat::U16,
            index_data.count(),
            index_data.as_bytes(),
        ) {
            Ok(handle) => handle,
            Err(error) => {
                buffers.destroy_vertex_buffer(vertex_buffer);
                return Err(error);
            }
        };

        Ok(GeometryBucket {
            format: self.format,
            vertex_data,
            index_data,
            bounds: self.bounds,
            vertex_buffer,
            index_buffer,
        })
    }
}

/// A batch of baked geometry drawn with a single call.
#[derive(Debug)]
pub struct GeometryBucket {
    format: GeometryFormat,
    vertex_data: VertexData,
    index_data: IndexData,
    bounds: AABB,
    vertex_buffer: VertexBufferHandle,
    index_buffer: IndexBufferHandle,
}

impl GeometryBucket {
    pub fn format(&self) -> &GeometryFormat {
        &self.format
    }

    pub fn vertex_data(&self) -> &VertexData {
        &self.vertex_data
    }

    pub fn index_data(&self) -> &IndexData {
        &self.index_data
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_data.vertex_count()
    }

    pub fn index_count(&self) -> usize {
        self.index_data.count()
    }

    pub fn bounds(&self) -> &AABB {
        &self.bounds
    }

    pub fn vertex_buffer(&self) -> VertexBufferHandle {
        self.vertex_buffer
    }

    pub fn index_buffer(&self) -> IndexBufferHandle {
        self.index_buffer
    }

    pub fn render_operation(&self) -> RenderOperation {
        RenderOperation {
            operation_type: self.format.operation_type,
            vertex_buffer: self.vertex_buffer,
            vertex_count: self.vertex_count() as u32,
            index_buffer: self.index_buffer,
            index_format: self.index_data.format(),
            index_count: self.index_count() as u32,
        }
    }

    pub(crate) fn destroy(self, buffers: &mut dyn BufferManager) {
        buffers.destroy_vertex_buffer(self.vertex_buffer);
        buffers.destroy_index_buffer(self.index_buffer);
    }
}

/// A geometry bucket as submitted to the render queue for one frame.
pub struct GeometryBucketRenderable<'a> {
    pub bucket: &'a GeometryBucket,
    pub material: MaterialId,
    pub lights: &'a [SceneLight],
    pub casts_shadows: bool,
}

impl Renderable for GeometryBucketRenderable<'_> {
    fn material(&self) -> MaterialId {
        self.material
    }

    fn render_operation(&self) -> RenderOperation {
        self.bucket.render_operation()
    }

    // Vertices are already in world space
    fn world_transform(&self) -> Mat4 {
        Mat4::IDENTITY
    }

    fn squared_view_depth(&self, camera_position: Vec3) -> f32 {
        self.bucket.bounds.center().distance_squared(camera_position)
    }

    fn lights(&self) -> &[SceneLight] {
        self.lights
    }

    fn casts_shadows(&self) -> bool {
        self.casts_shadows
    }
}
