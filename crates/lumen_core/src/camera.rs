use glam::{Mat4, Vec3};

use crate::transform::Transform;

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov: 45.0f32.to_radians(),
            aspect_ratio: 1920.0 / 1080.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Computes the "Projection Matrix" (View -> Clip), depth in [0, 1]
    pub fn compute_projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
    }

    /// Keeps the aspect ratio in sync with the viewport
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect_ratio = width as f32 / height as f32;
        }
    }

    /// Samples the matrices used by every stage of one frame.
    pub fn matrices(&self, transform: &Transform) -> CameraMatrices {
        CameraMatrices::new(transform.view_matrix(), self.compute_projection_matrix())
    }
}

/// Per-frame camera snapshot. Culling and the geometry pass read the same
/// copy so they agree on every tile frustum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    pub inverse_projection: Mat4,
    pub inverse_view_projection: Mat4,
}

impl CameraMatrices {
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self {
            view,
            projection,
            inverse_projection: projection.inverse(),
            inverse_view_projection: (projection * view).inverse(),
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// World-space eye position
    pub fn position(&self) -> Vec3 {
        self.view.inverse().transform_point3(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_round_trips_through_view_matrix() {
        let transform = Transform::from_xyz(3.0, 4.0, 5.0).looking_at(Vec3::ZERO, Vec3::Y);
        let matrices = Camera::default().matrices(&transform);
        assert!(matrices.position().distance(Vec3::new(3.0, 4.0, 5.0)) < 1e-4);
    }

    #[test]
    fn viewport_updates_aspect_ratio() {
        let mut camera = Camera::default();
        camera.set_viewport(800, 400);
        assert_eq!(camera.aspect_ratio, 2.0);

        camera.set_viewport(0, 400);
        assert_eq!(camera.aspect_ratio, 2.0);
    }
}
