use glam::{Mat4, Quat, Vec3};
use std::cell::{Cell, Ref, RefCell};

/// A decomposed world placement: `world = orientation * (local * scale) + position`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTransform {
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl WorldTransform {
    pub const IDENTITY: WorldTransform = WorldTransform {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(position: Vec3, orientation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            orientation,
            scale,
        }
    }

    pub fn from_translation(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.orientation * (point * self.scale) + self.position
    }

    /// Normals scale by the inverse of the scale to stay perpendicular to the surface.
    pub fn transform_normal(&self, normal: Vec3) -> Vec3 {
        (self.orientation * (normal / self.scale)).normalize_or_zero()
    }

    pub fn transform_tangent(&self, tangent: Vec3) -> Vec3 {
        (self.orientation * (tangent * self.scale)).normalize_or_zero()
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation, self.position)
    }
}

#[derive(Debug, Clone)]
pub struct Transform {
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,

    local_matrix: RefCell<Mat4>,
    world_matrix: RefCell<Mat4>,
    local_dirty: Cell<bool>,
    world_dirty: Cell<bool>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_translation(Vec3::ZERO)
    }
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            local_matrix: RefCell::new(Mat4::IDENTITY),
            world_matrix: RefCell::new(Mat4::IDENTITY),
            local_dirty: Cell::new(true),
            world_dirty: Cell::new(true),
        }
    }

    pub fn get_local_matrix(&self) -> Ref<Mat4> {
        if self.local_dirty.get() {
            let matrix =
                Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation);

            self.local_matrix.replace(matrix);
            self.local_dirty.set(false);
            self.invalidate_world();
        }

        self.local_matrix.borrow()
    }

    pub fn get_world_matrix(&self) -> Ref<Mat4> {
        self.world_matrix.borrow()
    }

    pub fn set_world_matrix(&self, world_matrix: Mat4) {
        self.world_matrix.replace(world_matrix);
        self.world_dirty.set(false);
    }

    /// World placement decomposed from the cached world matrix. Only meaningful
    /// once the owning scene has propagated transforms.
    pub fn world_transform(&self) -> WorldTransform {
        let (scale, orientation, position) = self.world_matrix.borrow().to_scale_rotation_translation();
        WorldTransform {
            position,
            orientation,
            scale,
        }
    }

    pub fn invalidate_local(&self) {
        self.local_dirty.set(true);
        self.world_dirty.set(true);
    }

    pub fn invalidate_world(&self) {
        self.world_dirty.set(true);
    }

    pub fn is_world_dirty(&self) -> bool {
        self.world_dirty.get()
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.invalidate_local();
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.translation = translation;
        self.invalidate_local();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.invalidate_local();
    }

    pub fn set_transform(&mut self, translation: Vec3, rotation: Quat, scale: Vec3) {
        self.translation = translation;
        self.rotation = rotation;
        self.scale = scale;
        self.invalidate_local();
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_is_scaled_then_rotated_then_translated() {
        let transform = WorldTransform::new(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Vec3::new(2.0, 1.0, 1.0),
        );

        let point = transform.transform_point(Vec3::X);
        assert!(point.abs_diff_eq(Vec3::new(10.0, 2.0, 0.0), 1e-5));
    }

    #[test]
    fn normals_use_inverse_scale() {
        let transform = WorldTransform::new(Vec3::ZERO, Quat::IDENTITY, Vec3::new(1.0, 4.0, 1.0));

        // A 45 degree surface flattened along y tilts its normal towards y
        let normal = transform.transform_normal(Vec3::new(1.0, 1.0, 0.0).normalize());
        assert!(normal.abs_diff_eq(Vec3::new(4.0, 1.0, 0.0).normalize(), 1e-5));
    }

    #[test]
    fn world_transform_round_trips_world_matrix() {
        let transform = Transform::default();
        let expected = WorldTransform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_y(0.5),
            Vec3::new(1.0, 2.0, 3.0),
        );
        transform.set_world_matrix(expected.to_matrix());

        let actual = transform.world_transform();
        assert!(actual.position.abs_diff_eq(expected.position, 1e-5));
        assert!(actual.scale.abs_diff_eq(expected.scale, 1e-5));
        assert!((actual.orientation * Vec3::X).abs_diff_eq(expected.orientation * Vec3::X, 1e-5));
    }
}
