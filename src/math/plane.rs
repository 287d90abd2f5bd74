use bytemuck::{Pod, Zeroable};
use glam::Vec3;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    /// Winding is chosen so that the frustum planes built from NDC corners face inwards
    /// after the flips applied in [`crate::math::frustum::Frustum::from_view_projection`].
    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Plane {
        let normal = (c - a).cross(b - a).normalize();
        let distance = -normal.dot(a);
        Plane { normal, distance }
    }

    pub fn flip(self) -> Plane {
        Plane {
            normal: -self.normal,
            distance: -self.distance,
        }
    }

    pub fn signed_distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flipped_plane_negates_distance() {
        let plane = Plane::from_points(Vec3::ZERO, Vec3::X, Vec3::Y);
        let point = Vec3::new(0.3, 0.2, 5.0);

        let d = plane.signed_distance_to_point(point);
        assert!((plane.flip().signed_distance_to_point(point) + d).abs() < 1e-6);
        assert!((d.abs() - 5.0).abs() < 1e-6);
    }
}
