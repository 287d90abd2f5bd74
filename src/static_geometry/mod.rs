//! Batches many static mesh instances into a few large pre-transformed buffers,
//! partitioned into a grid of regions that are culled and LOD-switched as units.

pub mod bounds;
pub mod config;
pub mod geometry_bucket;
pub mod grid;
pub mod lod_bucket;
pub mod material_bucket;
pub mod queued;
pub mod region;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use glam::{Quat, Vec3};
use id_arena::Arena;
use log::{debug, info, warn};

use crate::buffers::BufferManager;
use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::material_manager::MaterialManager;
use crate::math::AABB;
use crate::mesh_manager::{MeshId, MeshManager};
use crate::render_queue::RenderQueue;
use crate::scene_graph::{Entity, ObjectId, Scene, SceneLight, WorldTransform};

pub use config::{StaticGeometryConfig, MAX_VERTICES_PER_BUCKET};
pub use geometry_bucket::{GeometryBucket, GeometryFormat};
pub use grid::{CellIndex, GridIndexer};
pub use lod_bucket::LodBucket;
pub use material_bucket::MaterialBucket;
pub use queued::{QueuedSubMesh, SubMeshGeometry, SubMeshLodGeometry};
pub use region::{Region, RegionId};

use bounds::calculate_bounds;
use queued::determine_geometry;

/// Shared state threaded through the bucket hierarchy while building.
pub(crate) struct BuildContext<'a> {
    pub materials: &'a MaterialManager,
    pub buffers: &'a mut dyn BufferManager,
    pub max_vertices_per_bucket: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub regions: usize,
    pub lod_buckets: usize,
    pub material_buckets: usize,
    pub geometry_buckets: usize,
    pub vertices: usize,
    pub indices: usize,
}

pub struct StaticGeometry {
    name: String,
    config: StaticGeometryConfig,
    queued: Vec<QueuedSubMesh>,
    geometry_cache: HashMap<(MeshId, usize), Arc<SubMeshGeometry>>,
    regions: Arena<Region>,
    region_map: BTreeMap<u32, RegionId>,
    built: bool,
}

impl StaticGeometry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: StaticGeometryConfig::default(),
            queued: Vec::new(),
            geometry_cache: HashMap::new(),
            regions: Arena::new(),
            region_map: BTreeMap::new(),
            built: false,
        }
    }

    pub fn with_config(name: impl Into<String>, config: StaticGeometryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(name)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &StaticGeometryConfig {
        &self.config
    }

    /// Takes effect on the next [`StaticGeometry::build`].
    pub fn set_region_dimensions(&mut self, dimensions: Vec3) -> Result<()> {
        let config = StaticGeometryConfig {
            region_dimensions: dimensions,
            ..self.config.clone()
        };
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Takes effect on the next [`StaticGeometry::build`].
    pub fn set_origin(&mut self, origin: Vec3) {
        self.config.origin = origin;
    }

    pub fn set_upper_distance(&mut self, distance: f32) {
        self.config.upper_distance = distance.max(0.0);
    }

    pub fn set_cast_shadows(&mut self, cast_shadows: bool) {
        self.config.cast_shadows = cast_shadows;
    }

    pub fn set_max_vertices_per_bucket(&mut self, max_vertices: usize) -> Result<()> {
        let config = StaticGeometryConfig {
            max_vertices_per_bucket: max_vertices,
            ..self.config.clone()
        };
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.config.visible = visible;
        for (_, region) in self.regions.iter_mut() {
            region.set_visible(visible);
        }
    }

    pub fn is_visible(&self) -> bool {
        self.config.visible
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn queued_count(&self) -> usize {
        self.queued.len()
    }

    pub fn queued(&self) -> &[QueuedSubMesh] {
        &self.queued
    }

    pub fn grid(&self) -> Result<GridIndexer> {
        GridIndexer::new(self.config.origin, self.config.region_dimensions)
    }

    /// Queues every submesh of `entity` placed at the given world transform.
    /// Nothing is queued if any submesh fails.
    pub fn add_entity(
        &mut self,
        meshes: &MeshManager,
        entity: &Entity,
        position: Vec3,
        orientation: Quat,
        scale: Vec3,
    ) -> Result<()> {
        let transform = WorldTransform::new(position, orientation, scale);
        let mesh = meshes.get(entity.mesh_id)?;
        let grid = self.grid()?;

        if mesh.lod_manual {
            warn!(
                "Mesh '{}' uses manual LOD which static geometry cannot batch, only full detail is used",
                mesh.name
            );
        }

        let mut shared_bounds: Option<AABB> = None;
        let mut pending = Vec::with_capacity(entity.sub_entities.len());

        for (submesh_index, sub_entity) in entity.sub_entities.iter().enumerate() {
            let geometry = match self.geometry_cache.get(&(entity.mesh_id, submesh_index)) {
                Some(geometry) => geometry.clone(),
                None => {
                    let geometry = Arc::new(determine_geometry(mesh, submesh_index)?);
                    self.geometry_cache
                        .insert((entity.mesh_id, submesh_index), geometry.clone());
                    geometry
                }
            };

            let uses_shared = mesh.submeshes[submesh_index].uses_shared_vertices();
            let world_bounds = match (uses_shared, shared_bounds) {
                (true, Some(bounds)) => bounds,
                (true, None) => {
                    let bounds = calculate_bounds(mesh.submesh_vertex_data(submesh_index)?, &transform)?;
                    shared_bounds = Some(bounds);
                    bounds
                }
                (false, _) => calculate_bounds(&geometry.lod(0).vertex_data, &transform)?,
            };

            if world_bounds.is_null() {
                warn!(
                    "Skipping submesh {} of '{}' in entity '{}': it has no vertices",
                    submesh_index, mesh.name, entity.name
                );
                continue;
            }

            // Reject geometry outside the grid now rather than at build time
            grid.index_of(world_bounds.min)?;
            grid.index_of(world_bounds.max)?;

            pending.push(QueuedSubMesh {
                mesh_id: entity.mesh_id,
                submesh_index,
                material_name: sub_entity.material_name.clone(),
                operation_type: mesh.submeshes[submesh_index].operation_type,
                transform,
                world_bounds,
                geometry,
            });
        }

        debug!(
            "{}: queued {} submeshes of entity '{}'",
            self.name,
            pending.len(),
            entity.name
        );
        self.queued.extend(pending);
        Ok(())
    }

    /// Queues every entity attached directly to `object_id`, using the node's world transform.
    pub fn add_scene_node(
        &mut self,
        meshes: &MeshManager,
        scene: &Scene,
        object_id: ObjectId,
    ) -> Result<()> {
        scene.update_transforms();
        let object = scene.get_object(object_id).ok_or(Error::UnknownObject)?;
        let world = object.transform.world_transform();

        for entity in object.entities() {
            self.add_entity(meshes, entity, world.position, world.orientation, world.scale)?;
        }

        Ok(())
    }

    /// Bakes everything queued into regions and uploads the buffers. Any previous
    /// build is destroyed first. On error the partially built state is kept so that
    /// [`StaticGeometry::destroy`] can release it.
    pub fn build(
        &mut self,
        materials: &MaterialManager,
        buffers: &mut dyn BufferManager,
    ) -> Result<()> {
        self.destroy(buffers);
        let grid = self.grid()?;

        let assignments = self
            .queued
            .iter()
            .enumerate()
            .filter_map(|(index, queued)| {
                grid.best_cell(&queued.world_bounds)
                    .map(|cell| cell.map(|cell| (index, cell)))
                    .transpose()
            })
            .collect::<Result<Vec<_>>>()?;

        for (index, cell) in assignments {
            let region_id = self.region_for_cell(&grid, cell);
            self.regions[region_id].assign(index, &self.queued[index]);
        }

        let mut ctx = BuildContext {
            materials,
            buffers,
            max_vertices_per_bucket: self.config.max_vertices_per_bucket,
        };
        for &region_id in self.region_map.values() {
            self.regions[region_id].build(&self.queued, &mut ctx)?;
        }

        self.built = true;

        let stats = self.stats();
        info!(
            "Built static geometry '{}': {} regions, {} geometry buckets, {} vertices, {} indices",
            self.name, stats.regions, stats.geometry_buckets, stats.vertices, stats.indices
        );

        Ok(())
    }

    fn region_for_cell(&mut self, grid: &GridIndexer, cell: CellIndex) -> RegionId {
        let key = cell.pack();
        if let Some(&region_id) = self.region_map.get(&key) {
            return region_id;
        }

        let name = format!("{}:{}", self.name, key);
        debug!("Creating region {}", name);

        let region = Region::new(name, cell, grid.cell_centre(cell), self.config.visible);
        let region_id = self.regions.alloc(region);
        self.region_map.insert(key, region_id);
        region_id
    }

    /// Releases every region and its buffers. The queue is kept, so the geometry
    /// can be built again.
    pub fn destroy(&mut self, buffers: &mut dyn BufferManager) {
        for (_, region) in self.regions.iter_mut() {
            region.destroy(buffers);
        }

        self.regions = Arena::new();
        self.region_map.clear();
        self.built = false;
    }

    /// Destroys built regions and forgets all queued geometry.
    pub fn reset(&mut self, buffers: &mut dyn BufferManager) {
        self.destroy(buffers);
        self.queued.clear();
        self.geometry_cache.clear();
    }

    pub fn region_count(&self) -> usize {
        self.region_map.len()
    }

    /// Regions in key order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.region_map
            .values()
            .map(move |&region_id| &self.regions[region_id])
    }

    pub fn region(&self, key: u32) -> Option<&Region> {
        self.region_map
            .get(&key)
            .map(|&region_id| &self.regions[region_id])
    }

    /// The region queued geometry with these world bounds would be assigned to.
    pub fn get_region_for_bounds(&self, bounds: &AABB) -> Result<Option<&Region>> {
        let cell = self.grid()?.best_cell(bounds)?;
        Ok(cell.and_then(|cell| self.region(cell.pack())))
    }

    pub fn region_at_point(&self, point: Vec3) -> Result<Option<&Region>> {
        let cell = self.grid()?.index_of(point)?;
        Ok(self.region(cell.pack()))
    }

    /// Runs the per-frame visibility pass: picks each region's level of detail,
    /// caches the lights affecting it and submits the regions inside the camera
    /// frustum to `queue`.
    pub fn find_visible_objects<'a>(
        &'a mut self,
        camera: &Camera,
        aspect_ratio: f32,
        lights: &[SceneLight],
        queue: &mut RenderQueue<'a>,
    ) {
        if !self.config.visible {
            return;
        }

        let squared_upper_distance = self.config.squared_upper_distance();
        for (_, region) in self.regions.iter_mut() {
            region.notify_current_camera(camera.eye, squared_upper_distance);
            region.update_lights(lights);
        }

        let this: &'a StaticGeometry = self;
        let frustum = camera.frustum(aspect_ratio);
        for region in this.regions() {
            if region.is_visible()
                && !region.is_beyond_upper_distance()
                && region.bounds().intersects_frustum(&frustum)
            {
                region.update_render_queue(queue, this.config.cast_shadows);
            }
        }
    }

    pub fn stats(&self) -> BuildStats {
        let mut stats = BuildStats {
            regions: self.region_count(),
            ..Default::default()
        };

        for region in self.regions() {
            stats.lod_buckets += region.lod_buckets().len();

            for lod_bucket in region.lod_buckets() {
                stats.material_buckets += lod_bucket.material_bucket_count();

                for material_bucket in lod_bucket.material_buckets() {
                    for bucket in material_bucket.geometry_buckets() {
                        stats.geometry_buckets += 1;
                        stats.vertices += bucket.vertex_count();
                        stats.indices += bucket.index_count();
                    }
                }
            }
        }

        stats
    }
}
