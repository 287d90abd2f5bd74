use glam::{Mat4, Vec3};

use crate::math::frustum::Frustum;

pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::ZERO,
            target: Vec3::Z,
            up: Vec3::Y,
            fov_y: std::f32::consts::FRAC_PI_4,
            near: 0.1,
            far: 10_000.0,
        }
    }
}

impl Camera {
    pub fn get_vp_matrix(&self, aspect_ratio: f32) -> Mat4 {
        let view = Mat4::look_at_lh(self.eye, self.target, self.up);
        let projection = Mat4::perspective_lh(self.fov_y, aspect_ratio, self.near, self.far);
        projection * view
    }

    pub fn frustum(&self, aspect_ratio: f32) -> Frustum {
        Frustum::from_view_projection(self.get_vp_matrix(aspect_ratio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frustum_follows_view_direction() {
        let camera = Camera {
            eye: Vec3::new(0.0, 0.0, -100.0),
            target: Vec3::ZERO,
            ..Default::default()
        };

        let frustum = camera.frustum(16.0 / 9.0);
        assert!(frustum.contains_point(Vec3::ZERO));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, -200.0)));
    }
}
