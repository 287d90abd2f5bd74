use glam::Vec3;

use crate::math::frustum::Frustum;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn intersects_sphere(&self, other: &BoundingSphere) -> bool {
        let reach = self.radius + other.radius;
        (other.center - self.center).length_squared() <= reach * reach
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        (point - self.center).length_squared() <= self.radius * self.radius
    }
}

/// Axis-aligned box. The null box (min > max on every axis) is the identity for
/// [`AABB::merge`] and represents "no geometry".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for AABB {
    fn default() -> Self {
        Self::NULL
    }
}

impl AABB {
    pub const NULL: AABB = AABB {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    pub fn new(point1: Vec3, point2: Vec3) -> AABB {
        let min = point1.min(point2);
        let max = point1.max(point2);
        AABB { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> AABB {
        points.into_iter().fold(AABB::NULL, |mut aabb, point| {
            aabb.extend(point);
            aabb
        })
    }

    pub fn is_null(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn merge(&mut self, other: &AABB) {
        if other.is_null() {
            return;
        }

        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn intersection(&self, other: &AABB) -> AABB {
        if self.is_null() || other.is_null() {
            return AABB::NULL;
        }

        let min = self.min.max(other.min);
        let max = self.max.min(other.max);

        if min.cmpgt(max).any() {
            AABB::NULL
        } else {
            AABB { min, max }
        }
    }

    pub fn size(&self) -> Vec3 {
        if self.is_null() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn volume(&self) -> f32 {
        let size = self.size();
        size.x * size.y * size.z
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn corners(&self) -> [Vec3; 8] {
        [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    /// Distance from `point` to the farthest corner of the box.
    pub fn farthest_corner_distance(&self, point: Vec3) -> f32 {
        if self.is_null() {
            return 0.0;
        }

        self.corners()
            .iter()
            .map(|corner| corner.distance(point))
            .fold(0.0, f32::max)
    }

    pub fn intersects_frustum(&self, frustum: &Frustum) -> bool {
        if self.is_null() {
            return false;
        }

        let corners = self.corners();

        for plane in &frustum.planes {
            let mut outside = true;

            for corner in &corners {
                if plane.signed_distance_to_point(*corner) >= 0.0 {
                    outside = false;
                    break;
                }
            }

            if outside {
                return false;
            }
        }

        true
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_box_is_merge_identity() {
        let mut aabb = AABB::NULL;
        assert!(aabb.is_null());
        assert_eq!(aabb.volume(), 0.0);

        let other = AABB::new(Vec3::ZERO, Vec3::ONE);
        aabb.merge(&other);
        assert_eq!(aabb, other);

        aabb.merge(&AABB::NULL);
        assert_eq!(aabb, other);
    }

    #[test]
    fn from_points_with_no_points_is_null() {
        assert!(AABB::from_points(std::iter::empty()).is_null());

        let aabb = AABB::from_points([Vec3::new(1.0, -2.0, 3.0), Vec3::new(-1.0, 2.0, 0.0)]);
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn intersection_volume() {
        let a = AABB::new(Vec3::ZERO, Vec3::splat(2.0));
        let b = AABB::new(Vec3::ONE, Vec3::splat(3.0));
        let c = AABB::new(Vec3::splat(5.0), Vec3::splat(6.0));

        assert_eq!(a.intersection(&b).volume(), 1.0);
        assert!(a.intersection(&c).is_null());
        assert_eq!(a.intersection(&c).volume(), 0.0);
    }

    #[test]
    fn farthest_corner() {
        let aabb = AABB::new(Vec3::ZERO, Vec3::new(3.0, 4.0, 0.0));
        assert_eq!(aabb.farthest_corner_distance(Vec3::ZERO), 5.0);
        assert_eq!(AABB::NULL.farthest_corner_distance(Vec3::ZERO), 0.0);
    }

    #[test]
    fn sphere_overlap() {
        let a = BoundingSphere {
            center: Vec3::ZERO,
            radius: 1.0,
        };
        let b = BoundingSphere {
            center: Vec3::new(1.5, 0.0, 0.0),
            radius: 1.0,
        };
        let c = BoundingSphere {
            center: Vec3::new(3.0, 0.0, 0.0),
            radius: 0.5,
        };

        assert!(a.intersects_sphere(&b));
        assert!(!a.intersects_sphere(&c));
        assert!(a.contains_point(Vec3::new(0.5, 0.5, 0.0)));
    }
}
