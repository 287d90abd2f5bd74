use log::debug;

use crate::buffers::BufferManager;
use crate::error::Result;
use crate::material_manager::MaterialId;
use crate::static_geometry::geometry_bucket::{
    GeometryBucket, GeometryBucketBuilder, GeometryFormat,
};
use crate::static_geometry::queued::QueuedGeometry;
use crate::static_geometry::BuildContext;

/// All geometry of one LOD level in a region that is drawn with the same material.
#[derive(Debug)]
pub struct MaterialBucket {
    material_name: String,
    material: MaterialId,
    queued: Vec<QueuedGeometry>,
    geometry_buckets: Vec<GeometryBucket>,
}

impl MaterialBucket {
    pub(crate) fn new(material_name: String, material: MaterialId) -> Self {
        Self {
            material_name,
            material,
            queued: Vec::new(),
            geometry_buckets: Vec::new(),
        }
    }

    pub fn material_name(&self) -> &str {
        &self.material_name
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    pub fn geometry_buckets(&self) -> &[GeometryBucket] {
        &self.geometry_buckets
    }

    pub(crate) fn assign(&mut self, queued: QueuedGeometry) {
        self.queued.push(queued);
    }

    pub(crate) fn build(&mut self, label: &str, ctx: &mut BuildContext) -> Result<()> {
        let queued = std::mem::take(&mut self.queued);

        // Compatible geometry grouped in the order it was first seen
        let mut groups: Vec<(GeometryFormat, Vec<QueuedGeometry>)> = Vec::new();
        for geometry in queued {
            let format = GeometryFormat::of(&geometry);
            match groups.iter_mut().find(|(existing, _)| *existing == format) {
                Some((_, group)) => group.push(geometry),
                None => groups.push((format, vec![geometry])),
            }
        }

        let max_vertices = ctx.max_vertices_per_bucket;
        for (format, group) in groups {
            let mut current = GeometryBucketBuilder::new(format.clone());

            for geometry in &group {
                let vertex_count = geometry.geometry.vertex_data.vertex_count();

                if vertex_count > max_vertices {
                    current = current.append_primitives(geometry, max_vertices, |full| {
                        self.finish_bucket(full, label, ctx)
                    })?;
                    continue;
                }

                if !current.fits(vertex_count, max_vertices) {
                    let full = std::mem::replace(
                        &mut current,
                        GeometryBucketBuilder::new(format.clone()),
                    );
                    self.finish_bucket(full, label, ctx)?;
                }

                current.append(geometry)?;
            }

            if !current.is_empty() {
                self.finish_bucket(current, label, ctx)?;
            }
        }

        debug!(
            "{}: {} geometry buckets for material '{}'",
            label,
            self.geometry_buckets.len(),
            self.material_name
        );

        Ok(())
    }

    fn finish_bucket(
        &mut self,
        builder: GeometryBucketBuilder,
        label: &str,
        ctx: &mut BuildContext,
    ) -> Result<()> {
        let label = format!(
            "{label}/{}/{}",
            self.material_name,
            self.geometry_buckets.len()
        );
        let bucket = builder.finish(&label, ctx.buffers)?;
        self.geometry_buckets.push(bucket);
        Ok(())
    }

    pub(crate) fn destroy(&mut self, buffers: &mut dyn BufferManager) {
        for bucket in self.geometry_buckets.drain(..) {
            bucket.destroy(buffers);
        }
        self.queued.clear();
    }
}
