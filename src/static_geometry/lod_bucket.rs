use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::buffers::BufferManager;
use crate::error::Result;
use crate::static_geometry::material_bucket::MaterialBucket;
use crate::static_geometry::queued::QueuedGeometry;
use crate::static_geometry::BuildContext;

/// Geometry of a region at one level of detail, grouped by material.
#[derive(Debug)]
pub struct LodBucket {
    lod: usize,
    squared_distance: f32,
    queued: Vec<QueuedGeometry>,
    material_buckets: BTreeMap<String, MaterialBucket>,
}

impl LodBucket {
    pub(crate) fn new(lod: usize, squared_distance: f32) -> Self {
        Self {
            lod,
            squared_distance,
            queued: Vec::new(),
            material_buckets: BTreeMap::new(),
        }
    }

    pub fn lod(&self) -> usize {
        self.lod
    }

    pub fn squared_distance(&self) -> f32 {
        self.squared_distance
    }

    pub fn material_buckets(&self) -> impl Iterator<Item = &MaterialBucket> {
        self.material_buckets.values()
    }

    pub fn material_bucket(&self, material_name: &str) -> Option<&MaterialBucket> {
        self.material_buckets.get(material_name)
    }

    pub fn material_bucket_count(&self) -> usize {
        self.material_buckets.len()
    }

    pub(crate) fn assign(&mut self, queued: QueuedGeometry) {
        self.queued.push(queued);
    }

    pub(crate) fn build(&mut self, region_name: &str, ctx: &mut BuildContext) -> Result<()> {
        for queued in self.queued.drain(..) {
            let bucket = match self.material_buckets.entry(queued.material_name.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let material = ctx.materials.resolve(entry.key())?;
                    entry.insert(MaterialBucket::new(queued.material_name.clone(), material))
                }
            };
            bucket.assign(queued);
        }

        let label = format!("{region_name}/lod{}", self.lod);
        for bucket in self.material_buckets.values_mut() {
            bucket.build(&label, ctx)?;
        }

        Ok(())
    }

    pub(crate) fn destroy(&mut self, buffers: &mut dyn BufferManager) {
        for bucket in self.material_buckets.values_mut() {
            bucket.destroy(buffers);
        }
        self.material_buckets.clear();
        self.queued.clear();
    }
}
