use glam::{IVec3, Vec3};
use itertools::iproduct;

use crate::error::{Error, Result};
use crate::math::AABB;

pub const REGION_RANGE: i32 = 1024;
pub const REGION_HALF_RANGE: i32 = REGION_RANGE / 2;
pub const REGION_MIN_INDEX: i32 = -REGION_HALF_RANGE;
pub const REGION_MAX_INDEX: i32 = REGION_HALF_RANGE - 1;

const REGION_BITS: u32 = 10;
const REGION_MASK: u32 = (1 << REGION_BITS) - 1;

/// A grid cell, stored offset by [`REGION_HALF_RANGE`] so every component fits in 10 bits.
/// Orders lexicographically by (x, y, z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellIndex {
    pub x: u16,
    pub y: u16,
    pub z: u16,
}

impl CellIndex {
    pub fn from_signed(cell: IVec3) -> Option<Self> {
        let in_range = |value: i32| (REGION_MIN_INDEX..=REGION_MAX_INDEX).contains(&value);
        if !(in_range(cell.x) && in_range(cell.y) && in_range(cell.z)) {
            return None;
        }

        Some(Self {
            x: (cell.x + REGION_HALF_RANGE) as u16,
            y: (cell.y + REGION_HALF_RANGE) as u16,
            z: (cell.z + REGION_HALF_RANGE) as u16,
        })
    }

    pub fn signed(self) -> IVec3 {
        IVec3::new(self.x as i32, self.y as i32, self.z as i32) - IVec3::splat(REGION_HALF_RANGE)
    }

    pub fn pack(self) -> u32 {
        self.x as u32 | (self.y as u32) << REGION_BITS | (self.z as u32) << (REGION_BITS * 2)
    }

    pub fn unpack(key: u32) -> Self {
        Self {
            x: (key & REGION_MASK) as u16,
            y: ((key >> REGION_BITS) & REGION_MASK) as u16,
            z: ((key >> (REGION_BITS * 2)) & REGION_MASK) as u16,
        }
    }
}

/// Maps world positions onto the region grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridIndexer {
    origin: Vec3,
    dimensions: Vec3,
}

impl GridIndexer {
    pub fn new(origin: Vec3, dimensions: Vec3) -> Result<Self> {
        if !dimensions.is_finite() || dimensions.min_element() <= 0.0 {
            return Err(Error::InvalidRegionDimensions(dimensions));
        }

        Ok(Self { origin, dimensions })
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn dimensions(&self) -> Vec3 {
        self.dimensions
    }

    /// Cells are half-open, so a point on the grid's upper boundary lies outside it.
    pub fn index_of(&self, point: Vec3) -> Result<CellIndex> {
        let scaled = ((point - self.origin) / self.dimensions).floor();
        let cell = scaled.as_ivec3();

        let out_of_bounds = || Error::PointOutOfBounds { point, cell };
        if !scaled.is_finite() {
            return Err(out_of_bounds());
        }

        CellIndex::from_signed(cell).ok_or_else(out_of_bounds)
    }

    pub fn cell_bounds(&self, cell: CellIndex) -> AABB {
        let min = cell.signed().as_vec3() * self.dimensions + self.origin;
        AABB {
            min,
            max: min + self.dimensions,
        }
    }

    pub fn cell_centre(&self, cell: CellIndex) -> Vec3 {
        self.cell_bounds(cell).min + self.dimensions * 0.5
    }

    /// The cell holding the largest share of `bounds`. Ties go to the first cell in
    /// (x, y, z) order. A null box belongs to no cell. Both corners must map into
    /// the grid, so a box touching the upper boundary is rejected even when all of
    /// its volume is inside the last cell.
    pub fn best_cell(&self, bounds: &AABB) -> Result<Option<CellIndex>> {
        if bounds.is_null() {
            return Ok(None);
        }

        let min = self.index_of(bounds.min)?;
        let max = self.index_of(bounds.max)?;

        let mut best: Option<(CellIndex, f32)> = None;
        for (x, y, z) in iproduct!(min.x..=max.x, min.y..=max.y, min.z..=max.z) {
            let cell = CellIndex { x, y, z };
            let overlap = self.overlap(bounds, cell);

            if best.map_or(true, |(_, best_overlap)| overlap > best_overlap) {
                best = Some((cell, overlap));
            }
        }

        Ok(best.map(|(cell, _)| cell))
    }

    fn overlap(&self, bounds: &AABB, cell: CellIndex) -> f32 {
        let cell_bounds = self.cell_bounds(cell);
        let overlap = (bounds.max.min(cell_bounds.max) - bounds.min.max(cell_bounds.min))
            .max(Vec3::ZERO);

        // Flat axes contribute a factor of one, otherwise planar geometry scores zero everywhere
        let flat = bounds.size().cmpeq(Vec3::ZERO);
        let factors = Vec3::select(flat, Vec3::ONE, overlap);
        factors.x * factors.y * factors.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn grid() -> GridIndexer {
        GridIndexer::new(Vec3::ZERO, Vec3::splat(100.0)).unwrap()
    }

    #[test]
    fn index_of_floors_towards_negative_infinity() {
        let grid = grid();
        assert_eq!(grid.index_of(Vec3::new(50.0, 0.0, 99.9)).unwrap().signed(), IVec3::ZERO);
        assert_eq!(
            grid.index_of(Vec3::new(-0.1, 100.0, -250.0)).unwrap().signed(),
            IVec3::new(-1, 1, -3)
        );
    }

    #[test]
    fn index_of_rejects_points_outside_grid() {
        let grid = grid();
        assert!(grid.index_of(Vec3::new(51_199.0, 0.0, 0.0)).is_ok());
        assert!(grid.index_of(Vec3::new(-51_200.0, 0.0, 0.0)).is_ok());

        assert!(matches!(
            grid.index_of(Vec3::new(51_200.0, 0.0, 0.0)),
            Err(Error::PointOutOfBounds { .. })
        ));
        assert!(grid.index_of(Vec3::new(0.0, -51_201.0, 0.0)).is_err());
        assert!(grid.index_of(Vec3::new(0.0, 0.0, f32::NAN)).is_err());
        assert!(grid.index_of(Vec3::new(f32::INFINITY, 0.0, 0.0)).is_err());
    }

    #[test]
    fn packed_keys_are_unique_and_reversible() {
        let mut keys = HashSet::new();
        for (x, y, z) in iproduct!(
            [REGION_MIN_INDEX, -1, 0, 1, REGION_MAX_INDEX],
            [REGION_MIN_INDEX, -1, 0, 1, REGION_MAX_INDEX],
            [REGION_MIN_INDEX, -1, 0, 1, REGION_MAX_INDEX]
        ) {
            let cell = CellIndex::from_signed(IVec3::new(x, y, z)).unwrap();
            let key = cell.pack();
            assert!(keys.insert(key));
            assert_eq!(CellIndex::unpack(key), cell);
        }

        assert!(CellIndex::from_signed(IVec3::new(512, 0, 0)).is_none());
    }

    #[test]
    fn cell_geometry() {
        let grid = GridIndexer::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(100.0, 50.0, 20.0)).unwrap();
        let cell = CellIndex::from_signed(IVec3::new(-1, 2, 0)).unwrap();

        let bounds = grid.cell_bounds(cell);
        assert_eq!(bounds.min, Vec3::new(-90.0, 100.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(10.0, 150.0, 20.0));
        assert_eq!(grid.cell_centre(cell), Vec3::new(-40.0, 125.0, 10.0));
    }

    #[test]
    fn best_cell_picks_largest_overlap() {
        let grid = grid();
        let bounds = AABB::new(Vec3::new(80.0, 10.0, 10.0), Vec3::new(150.0, 20.0, 20.0));

        let cell = grid.best_cell(&bounds).unwrap().unwrap();
        assert_eq!(cell.signed(), IVec3::new(1, 0, 0));
    }

    #[test]
    fn best_cell_breaks_ties_in_scan_order() {
        let grid = grid();
        let bounds = AABB::new(Vec3::new(50.0, 50.0, 50.0), Vec3::new(150.0, 150.0, 60.0));

        let cell = grid.best_cell(&bounds).unwrap().unwrap();
        assert_eq!(cell.signed(), IVec3::ZERO);
    }

    #[test]
    fn best_cell_handles_flat_geometry() {
        let grid = grid();
        let bounds = AABB::new(Vec3::new(-20.0, 0.0, 10.0), Vec3::new(90.0, 0.0, 30.0));

        let cell = grid.best_cell(&bounds).unwrap().unwrap();
        assert_eq!(cell.signed(), IVec3::ZERO);
    }

    #[test]
    fn best_cell_is_deterministic() {
        let grid = grid();
        let bounds = AABB::new(Vec3::splat(-130.0), Vec3::splat(170.0));
        let first = grid.best_cell(&bounds).unwrap();

        for _ in 0..10 {
            assert_eq!(grid.best_cell(&bounds).unwrap(), first);
        }
    }

    #[test]
    fn best_cell_rejects_box_touching_upper_boundary() {
        let grid = grid();

        let inside = AABB::new(Vec3::new(51_150.0, 0.0, 0.0), Vec3::new(51_199.0, 10.0, 10.0));
        let cell = grid.best_cell(&inside).unwrap().unwrap();
        assert_eq!(cell.signed(), IVec3::new(REGION_MAX_INDEX, 0, 0));

        let touching = AABB::new(Vec3::new(51_150.0, 0.0, 0.0), Vec3::new(51_200.0, 10.0, 10.0));
        assert!(matches!(
            grid.best_cell(&touching),
            Err(Error::PointOutOfBounds { .. })
        ));
    }

    #[test]
    fn best_cell_of_null_box_is_none() {
        assert_eq!(grid().best_cell(&AABB::NULL).unwrap(), None);
    }
}
