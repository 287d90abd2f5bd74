use glam::Vec3;
use id_arena::Id;
use log::debug;

use crate::buffers::BufferManager;
use crate::error::Result;
use crate::math::{BoundingSphere, AABB};
use crate::render_queue::RenderQueue;
use crate::scene_graph::SceneLight;
use crate::static_geometry::geometry_bucket::GeometryBucketRenderable;
use crate::static_geometry::grid::CellIndex;
use crate::static_geometry::lod_bucket::LodBucket;
use crate::static_geometry::queued::{QueuedGeometry, QueuedSubMesh};
use crate::static_geometry::BuildContext;

pub type RegionId = Id<Region>;

/// One grid cell worth of batched geometry, culled and LOD-switched as a unit.
#[derive(Debug)]
pub struct Region {
    name: String,
    key: u32,
    cell: CellIndex,
    centre: Vec3,
    /// Positions in the owning static geometry's queue.
    queued: Vec<usize>,
    lod_squared_distances: Vec<f32>,
    lod_buckets: Vec<LodBucket>,
    bounds: AABB,
    bounding_radius: f32,
    visible: bool,

    current_lod: usize,
    camera_distance_squared: f32,
    beyond_upper_distance: bool,
    lights: Vec<SceneLight>,
}

impl Region {
    pub(crate) fn new(name: String, cell: CellIndex, centre: Vec3, visible: bool) -> Self {
        Self {
            name,
            key: cell.pack(),
            cell,
            centre,
            queued: Vec::new(),
            lod_squared_distances: vec![0.0],
            lod_buckets: Vec::new(),
            bounds: AABB::NULL,
            bounding_radius: 0.0,
            visible,
            current_lod: 0,
            camera_distance_squared: 0.0,
            beyond_upper_distance: false,
            lights: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> u32 {
        self.key
    }

    pub fn cell(&self) -> CellIndex {
        self.cell
    }

    pub fn centre(&self) -> Vec3 {
        self.centre
    }

    pub fn bounds(&self) -> &AABB {
        &self.bounds
    }

    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere {
            center: self.centre,
            radius: self.bounding_radius,
        }
    }

    pub fn queued_count(&self) -> usize {
        self.queued.len()
    }

    pub fn lod_count(&self) -> usize {
        self.lod_squared_distances.len()
    }

    pub fn lod_squared_distances(&self) -> &[f32] {
        &self.lod_squared_distances
    }

    pub fn lod_buckets(&self) -> &[LodBucket] {
        &self.lod_buckets
    }

    pub fn current_lod(&self) -> usize {
        self.current_lod
    }

    pub fn camera_distance_squared(&self) -> f32 {
        self.camera_distance_squared
    }

    pub fn is_beyond_upper_distance(&self) -> bool {
        self.beyond_upper_distance
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn lights(&self) -> &[SceneLight] {
        &self.lights
    }

    pub(crate) fn assign(&mut self, index: usize, queued: &QueuedSubMesh) {
        self.queued.push(index);

        // A level's distance comes from the first submesh that has that level
        let distances = &queued.geometry.lod_squared_distances;
        if distances.len() > self.lod_squared_distances.len() {
            self.lod_squared_distances
                .extend_from_slice(&distances[self.lod_squared_distances.len()..]);
        }

        self.bounds.merge(&queued.world_bounds);
    }

    pub(crate) fn build(&mut self, queue: &[QueuedSubMesh], ctx: &mut BuildContext) -> Result<()> {
        self.bounding_radius = self.bounds.farthest_corner_distance(self.centre);

        for (lod, &squared_distance) in self.lod_squared_distances.iter().enumerate() {
            let mut bucket = LodBucket::new(lod, squared_distance);
            for &index in &self.queued {
                bucket.assign(QueuedGeometry::new(&queue[index], lod));
            }

            // Pushed before building so a failed build still releases what was uploaded
            self.lod_buckets.push(bucket);
            if let Some(bucket) = self.lod_buckets.last_mut() {
                bucket.build(&self.name, ctx)?;
            }
        }

        debug!(
            "Built region {} with {} submeshes over {} LOD levels",
            self.name,
            self.queued.len(),
            self.lod_buckets.len()
        );

        Ok(())
    }

    /// Picks the level of detail for a camera at `camera_position`.
    pub fn notify_current_camera(&mut self, camera_position: Vec3, squared_upper_distance: f32) {
        self.camera_distance_squared = self.centre.distance_squared(camera_position);
        self.beyond_upper_distance =
            squared_upper_distance > 0.0 && self.camera_distance_squared > squared_upper_distance;

        self.current_lod = self
            .lod_squared_distances
            .iter()
            .rposition(|&distance| distance <= self.camera_distance_squared)
            .unwrap_or(0);
    }

    /// Keeps the lights whose range reaches this region.
    pub fn update_lights(&mut self, lights: &[SceneLight]) {
        let sphere = self.bounding_sphere();
        self.lights = lights
            .iter()
            .filter(|light| {
                BoundingSphere {
                    center: light.position,
                    radius: light.range,
                }
                .intersects_sphere(&sphere)
            })
            .cloned()
            .collect();
    }

    /// Submits every geometry bucket of the current LOD level.
    pub fn update_render_queue<'a>(&'a self, queue: &mut RenderQueue<'a>, casts_shadows: bool) {
        let Some(lod_bucket) = self.lod_buckets.get(self.current_lod) else {
            return;
        };

        for material_bucket in lod_bucket.material_buckets() {
            for bucket in material_bucket.geometry_buckets() {
                queue.add(Box::new(GeometryBucketRenderable {
                    bucket,
                    material: material_bucket.material(),
                    lights: &self.lights,
                    casts_shadows,
                }));
            }
        }
    }

    pub(crate) fn destroy(&mut self, buffers: &mut dyn BufferManager) {
        for bucket in &mut self.lod_buckets {
            bucket.destroy(buffers);
        }
        self.lod_buckets.clear();
    }
}
