use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::math::AABB;
use crate::mesh_manager::MeshId;
use crate::model::{IndexData, Mesh, OperationType, VertexData};
use crate::scene_graph::WorldTransform;

/// Vertex and index data for one LOD level of a submesh, compacted so every
/// vertex is referenced.
#[derive(Debug, Clone)]
pub struct SubMeshLodGeometry {
    pub vertex_data: Arc<VertexData>,
    pub index_data: Arc<IndexData>,
}

/// Geometry for every LOD level of a submesh, shared by all instances of its mesh.
#[derive(Debug)]
pub struct SubMeshGeometry {
    pub lods: Vec<SubMeshLodGeometry>,
    /// Squared activation distance per level; level 0 is always 0.
    pub lod_squared_distances: Vec<f32>,
}

impl SubMeshGeometry {
    /// Geometry for `lod`, or the lowest detail level when the mesh has fewer levels.
    pub fn lod(&self, lod: usize) -> &SubMeshLodGeometry {
        &self.lods[lod.min(self.lods.len() - 1)]
    }

    pub fn num_lod_levels(&self) -> usize {
        self.lods.len()
    }
}

/// One submesh instance waiting to be baked.
#[derive(Debug, Clone)]
pub struct QueuedSubMesh {
    pub mesh_id: MeshId,
    pub submesh_index: usize,
    pub material_name: String,
    pub operation_type: OperationType,
    pub transform: WorldTransform,
    pub world_bounds: AABB,
    pub geometry: Arc<SubMeshGeometry>,
}

/// A queued submesh narrowed to a single LOD level, as seen by the bucket hierarchy.
#[derive(Debug, Clone)]
pub(crate) struct QueuedGeometry {
    pub material_name: String,
    pub operation_type: OperationType,
    pub transform: WorldTransform,
    pub geometry: SubMeshLodGeometry,
}

impl QueuedGeometry {
    pub fn new(queued: &QueuedSubMesh, lod: usize) -> Self {
        Self {
            material_name: queued.material_name.clone(),
            operation_type: queued.operation_type,
            transform: queued.transform,
            geometry: queued.geometry.lod(lod).clone(),
        }
    }
}

pub(crate) fn determine_geometry(mesh: &Mesh, submesh_index: usize) -> Result<SubMeshGeometry> {
    let submesh = mesh
        .submeshes
        .get(submesh_index)
        .ok_or_else(|| Error::MissingVertexData {
            mesh: mesh.name.clone(),
            submesh: submesh_index,
        })?;
    let vertex_data = mesh.submesh_vertex_data(submesh_index)?;

    let num_lods = if mesh.lod_manual {
        1
    } else {
        mesh.num_lod_levels()
    };

    // Shared vertices are only usable as-is when no other submesh indexes into them
    let use_directly = |lod: usize| {
        if submesh.uses_shared_vertices() {
            mesh.submeshes.len() == 1
        } else {
            lod == 0
        }
    };

    let mut lods = Vec::with_capacity(num_lods);
    let mut lod_squared_distances = Vec::with_capacity(num_lods);
    for lod in 0..num_lods {
        let index_data = submesh.index_data_for_lod(lod);
        let geometry = if use_directly(lod) {
            SubMeshLodGeometry {
                vertex_data: vertex_data.clone(),
                index_data: index_data.clone(),
            }
        } else {
            split_geometry(vertex_data, index_data)?
        };

        lods.push(geometry);
        lod_squared_distances.push(
            mesh.lod_usage(lod)
                .map_or(0.0, |usage| usage.from_depth_squared()),
        );
    }

    Ok(SubMeshGeometry {
        lods,
        lod_squared_distances,
    })
}

/// Copies out only the vertices `index_data` references and rewrites the indices to match.
/// Vertices keep the order in which the index list first uses them.
pub(crate) fn split_geometry(
    vertex_data: &Arc<VertexData>,
    index_data: &Arc<IndexData>,
) -> Result<SubMeshLodGeometry> {
    let vertex_count = vertex_data.vertex_count();

    let mut remap: HashMap<u32, u32> = HashMap::new();
    let mut used = Vec::new();
    for index in index_data.iter() {
        if index as usize >= vertex_count {
            return Err(Error::IndexOutOfRange {
                index,
                vertex_count,
            });
        }

        remap.entry(index).or_insert_with(|| {
            used.push(index as usize);
            (used.len() - 1) as u32
        });
    }

    if used.len() == vertex_count {
        return Ok(SubMeshLodGeometry {
            vertex_data: vertex_data.clone(),
            index_data: index_data.clone(),
        });
    }

    let new_index_data = match index_data.as_ref() {
        IndexData::U16(indices) => IndexData::U16(
            indices
                .iter()
                .map(|index| remap[&(*index as u32)] as u16)
                .collect(),
        ),
        IndexData::U32(indices) => {
            IndexData::U32(indices.iter().map(|index| remap[index]).collect())
        }
    };

    Ok(SubMeshLodGeometry {
        vertex_data: Arc::new(vertex_data.gather(used)),
        index_data: Arc::new(new_index_data),
    })
}
