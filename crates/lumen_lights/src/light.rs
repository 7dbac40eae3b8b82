use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Size of one packed [`PointLight`] record in the light buffer.
pub const POINT_LIGHT_SIZE: usize = 32;

// The packed record is the std430 layout of
// `struct PointLight { vec3 color; float intensity; vec3 position; float radius; }`:
// color at 0, intensity at 12, position at 16, radius at 28. Aligned to 16
// so a host slice can be copied straight into a storage buffer.
#[repr(C, align(16))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PointLight {
    pub color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
    /// Attenuation cutoff; contribution is exactly zero beyond it.
    pub radius: f32,
}

const _: () = assert!(std::mem::size_of::<PointLight>() == POINT_LIGHT_SIZE);
const _: () = assert!(std::mem::align_of::<PointLight>() == 16);

impl PointLight {
    pub fn new(position: Vec3, color: Vec3, intensity: f32, radius: f32) -> Self {
        Self {
            color,
            intensity,
            position,
            radius,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Decodes one record; `None` unless `bytes` is exactly 32 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytemuck::try_pod_read_unaligned(bytes).ok()
    }

    /// Whether `point` lies inside the light's sphere of influence
    pub fn reaches(&self, point: Vec3) -> bool {
        self.position.distance_squared(point) <= self.radius * self.radius
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    pub color: Vec3,
    pub brightness: f32,
    direction: Vec3,
}

impl DirectionalLight {
    /// `direction` is normalized; a zero vector falls back to straight down.
    pub fn new(direction: Vec3, color: Vec3, brightness: f32) -> Self {
        let direction = direction.try_normalize().unwrap_or(Vec3::NEG_Y);
        Self {
            color,
            brightness,
            direction,
        }
    }

    /// Unit-length direction the light travels in
    pub fn direction(&self) -> Vec3 {
        self.direction
    }
}
