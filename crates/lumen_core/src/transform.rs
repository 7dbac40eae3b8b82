use glam::{Mat4, Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: Vec3::new(x, y, z),
            ..Default::default()
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Makes the transform look at a target position
    pub fn looking_at(mut self, target: Vec3, up: Vec3) -> Self {
        // look_at_rh builds the view matrix; its inverse is the camera's world rotation
        let view = Mat4::look_at_rh(self.translation, target, up);
        self.rotation = Quat::from_mat4(&view.inverse()).normalize();
        self
    }

    /// View matrix (World -> View), camera looks down -Z
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.translation, self.forward(), self.up())
    }

    /// Returns the "Forward" direction (-Z) relative to current rotation
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Returns the "Up" direction (+Y) relative to current rotation
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }
}
