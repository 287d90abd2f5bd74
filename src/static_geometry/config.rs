use glam::Vec3;

use crate::error::{Error, Result};

/// Largest vertex count addressable with 16-bit indices.
pub const MAX_VERTICES_PER_BUCKET: usize = u16::MAX as usize;

// One triangle must always fit into an empty bucket
const MIN_VERTICES_PER_BUCKET: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct StaticGeometryConfig {
    /// World-space size of one grid cell.
    pub region_dimensions: Vec3,
    /// World position of the corner of cell (0, 0, 0).
    pub origin: Vec3,
    /// Regions farther than this from the camera are not drawn. 0 disables the limit.
    pub upper_distance: f32,
    pub cast_shadows: bool,
    pub visible: bool,
    pub max_vertices_per_bucket: usize,
}

impl Default for StaticGeometryConfig {
    fn default() -> Self {
        Self {
            region_dimensions: Vec3::splat(1000.0),
            origin: Vec3::ZERO,
            upper_distance: 0.0,
            cast_shadows: false,
            visible: true,
            max_vertices_per_bucket: MAX_VERTICES_PER_BUCKET,
        }
    }
}

impl StaticGeometryConfig {
    pub fn validate(&self) -> Result<()> {
        let dimensions = self.region_dimensions;
        if !dimensions.is_finite() || dimensions.min_element() <= 0.0 {
            return Err(Error::InvalidRegionDimensions(dimensions));
        }

        if !(MIN_VERTICES_PER_BUCKET..=MAX_VERTICES_PER_BUCKET)
            .contains(&self.max_vertices_per_bucket)
        {
            return Err(Error::InvalidBucketCapacity {
                requested: self.max_vertices_per_bucket,
                max: MAX_VERTICES_PER_BUCKET,
            });
        }

        Ok(())
    }

    pub fn squared_upper_distance(&self) -> f32 {
        self.upper_distance * self.upper_distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = StaticGeometryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.region_dimensions, Vec3::splat(1000.0));
        assert_eq!(config.max_vertices_per_bucket, 65_535);
    }

    #[test]
    fn rejects_bad_dimensions() {
        let config = StaticGeometryConfig {
            region_dimensions: Vec3::new(100.0, 0.0, 100.0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidRegionDimensions(_))
        ));

        let config = StaticGeometryConfig {
            region_dimensions: Vec3::new(100.0, f32::NAN, 100.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_capacity() {
        for capacity in [0, 2, 65_536] {
            let config = StaticGeometryConfig {
                max_vertices_per_bucket: capacity,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(Error::InvalidBucketCapacity { .. })
            ));
        }
    }
}
