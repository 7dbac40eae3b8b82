use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    camera::Camera,
    events::LightAddRequest,
    render_mode::RenderMode,
    transform::Transform,
};

/// Largest light store a config may request. The store preallocates this
/// many records.
pub const MAX_LIGHTS_LIMIT: usize = 1 << 20;
/// Largest per-tile list a config may request.
pub const MAX_LIGHTS_PER_TILE_LIMIT: usize = 4096;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LumenConfig {
    pub viewport: ViewportConfig,
    pub camera: CameraConfig,
    pub culling: CullingConfig,
    pub shading: ShadingConfig,
    pub lights: LightsConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(18.0, 60.0, 80.0),
            target: Vec3::new(18.0, 0.0, 18.0),
            fov_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl CameraConfig {
    pub fn camera(&self, viewport: ViewportConfig) -> Camera {
        let mut camera = Camera {
            fov: self.fov_degrees.to_radians(),
            near: self.near,
            far: self.far,
            ..Default::default()
        };
        camera.set_viewport(viewport.width, viewport.height);
        camera
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.position).looking_at(self.target, Vec3::Y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CullingConfig {
    pub max_lights: usize,
    pub max_lights_per_tile: usize,
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self {
            max_lights: 1024,
            max_lights_per_tile: 1024,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingConfig {
    pub ambient: f32,
    /// Light count that saturates the heatmap.
    pub heatmap_scale: f32,
    pub clear_color: Vec3,
    pub initial_mode: RenderMode,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            ambient: 0.1,
            heatmap_scale: 4.0,
            clear_color: Vec3::ZERO,
            initial_mode: RenderMode::Lit,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointLightConfig {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub radius: f32,
}

impl From<PointLightConfig> for LightAddRequest {
    fn from(light: PointLightConfig) -> Self {
        LightAddRequest {
            position: light.position,
            color: light.color,
            intensity: light.intensity,
            radius: light.radius,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLightConfig {
    pub color: Vec3,
    pub brightness: f32,
    pub direction: Vec3,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightsConfig {
    pub point: Vec<PointLightConfig>,
    pub directional: Option<DirectionalLightConfig>,
}

impl Default for LightsConfig {
    fn default() -> Self {
        let white = |x: f32, z: f32| PointLightConfig {
            position: Vec3::new(x, 12.0, z),
            color: Vec3::ONE,
            intensity: 1.0,
            radius: 10.0,
        };

        Self {
            point: vec![
                PointLightConfig {
                    position: Vec3::new(16.0, 4.0, 16.0),
                    color: Vec3::new(0.0, 1.0, 0.0),
                    intensity: 1.0,
                    radius: 5.0,
                },
                white(0.0, 0.0),
                white(36.0, 0.0),
                white(0.0, 36.0),
                white(36.0, 36.0),
            ],
            directional: None,
        }
    }
}

impl LumenConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: LumenConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "viewport must be non-empty, got {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }
        if self.culling.max_lights == 0 || self.culling.max_lights_per_tile == 0 {
            return Err(ConfigError::Invalid(
                "max_lights and max_lights_per_tile must be positive".into(),
            ));
        }
        if self.culling.max_lights > MAX_LIGHTS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_lights {} exceeds the limit of {MAX_LIGHTS_LIMIT}",
                self.culling.max_lights
            )));
        }
        if self.culling.max_lights_per_tile > MAX_LIGHTS_PER_TILE_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_lights_per_tile {} exceeds the limit of {MAX_LIGHTS_PER_TILE_LIMIT}",
                self.culling.max_lights_per_tile
            )));
        }
        if self.lights.point.len() > self.culling.max_lights {
            return Err(ConfigError::Invalid(format!(
                "{} configured lights exceed max_lights {}",
                self.lights.point.len(),
                self.culling.max_lights
            )));
        }
        let camera = &self.camera;
        if !(camera.near > 0.0 && camera.far > camera.near) {
            return Err(ConfigError::Invalid(format!(
                "camera planes must satisfy 0 < near < far, got {} / {}",
                camera.near, camera.far
            )));
        }
        if !(camera.fov_degrees > 0.0 && camera.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "fov_degrees out of range: {}",
                camera.fov_degrees
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_setup() {
        let config = LumenConfig::default();
        assert_eq!(config.viewport.width, 1920);
        assert_eq!(config.viewport.height, 1080);
        assert_eq!(config.culling.max_lights, 1024);
        assert_eq!(config.culling.max_lights_per_tile, 1024);
        assert_eq!(config.shading.ambient, 0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: LumenConfig = serde_json::from_str(
            r#"{ "viewport": { "width": 640 }, "shading": { "initial_mode": "Normals" } }"#,
        )
        .unwrap();
        assert_eq!(config.viewport.width, 640);
        assert_eq!(config.viewport.height, 1080);
        assert_eq!(config.shading.initial_mode, RenderMode::Normals);
        assert_eq!(config.culling, CullingConfig::default());
    }

    #[test]
    fn rejects_inverted_camera_planes() {
        let mut config = LumenConfig::default();
        config.camera.near = 10.0;
        config.camera.far = 1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_more_lights_than_capacity() {
        let mut config = LumenConfig::default();
        config.culling.max_lights = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_capacities_past_the_limits() {
        let mut config = LumenConfig::default();
        config.culling.max_lights_per_tile = 1 << 62;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = LumenConfig::default();
        config.culling.max_lights = i32::MAX as usize + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = LumenConfig::default();
        config.culling.max_lights = MAX_LIGHTS_LIMIT;
        config.culling.max_lights_per_tile = MAX_LIGHTS_PER_TILE_LIMIT;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = LumenConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
