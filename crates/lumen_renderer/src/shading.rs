use glam::{Vec2, Vec3};
use lumen_core::{CameraMatrices, RenderMode, config::ShadingConfig};
use lumen_lights::{DirectionalLight, LightSnapshot, PointLight};
use rayon::prelude::*;

use crate::{
    error::{RenderError, RenderResult},
    tile_grid::TileGrid,
    visible_indices::VisibleLightIndexBuffer,
};

/// What the geometry pass knows about the closest surface under a pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Surface {
    pub world_position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub albedo: Vec3,
}

/// Per-pixel surfaces, `None` for background. Row 0 is the top of the screen.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceBuffer {
    width: u32,
    height: u32,
    data: Vec<Option<Surface>>,
}

impl SurfaceBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![None; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(width as usize * height as usize, None);
    }

    pub fn get(&self, x: u32, y: u32) -> Option<&Surface> {
        self.data[y as usize * self.width as usize + x as usize].as_ref()
    }

    pub fn set(&mut self, x: u32, y: u32, surface: Option<Surface>) {
        self.data[y as usize * self.width as usize + x as usize] = surface;
    }

    pub fn data_mut(&mut self) -> &mut [Option<Surface>] {
        &mut self.data
    }
}

/// Source of per-pixel surfaces (the geometry pass).
pub trait SurfaceProvider {
    fn render_surfaces(&self, camera: &CameraMatrices, surfaces: &mut SurfaceBuffer);
}

/// Linear RGB output of the shading stage.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorBuffer {
    width: u32,
    height: u32,
    data: Vec<Vec3>,
}

impl ColorBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![Vec3::ZERO; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(width as usize * height as usize, Vec3::ZERO);
    }

    pub fn get(&self, x: u32, y: u32) -> Vec3 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn pixels(&self) -> &[Vec3] {
        &self.data
    }

    /// Clamped 8-bit RGBA, row-major from the top.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.data
            .iter()
            .flat_map(|color| {
                let c = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
                [c.x as u8, c.y as u8, c.z as u8, u8::MAX]
            })
            .collect()
    }
}

/// Contribution of one point light at a surface.
pub fn point_light_contribution(light: &PointLight, surface: &Surface) -> Vec3 {
    let light_vector = light.position - surface.world_position;
    let distance = light_vector.length();
    let n_dot_l = if distance > 0.0 {
        surface.normal.dot(light_vector / distance).max(0.0)
    } else {
        0.0
    };
    let attenuation = (1.0 - distance / light.radius).clamp(0.0, 1.0);
    attenuation * n_dot_l * light.color * light.intensity
}

pub fn directional_contribution(light: &DirectionalLight, surface: &Surface) -> Vec3 {
    surface.normal.dot(-light.direction()).max(0.0) * light.color * light.brightness
}

/// Final per-pixel composition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadingStage {
    pub ambient: f32,
    pub heatmap_scale: f32,
    pub clear_color: Vec3,
}

impl Default for ShadingStage {
    fn default() -> Self {
        Self::from_config(&ShadingConfig::default())
    }
}

impl ShadingStage {
    pub fn from_config(config: &ShadingConfig) -> Self {
        Self {
            ambient: config.ambient,
            heatmap_scale: config.heatmap_scale,
            clear_color: config.clear_color,
        }
    }

    /// Shades one surface against a tile's light list.
    pub fn shade_surface(
        &self,
        surface: &Surface,
        tile_lights: impl Iterator<Item = usize>,
        lights: &LightSnapshot,
        mode: RenderMode,
    ) -> Vec3 {
        match mode {
            RenderMode::Lit => {
                let mut contribution = tile_lights
                    .filter_map(|index| lights.get(index))
                    .map(|light| point_light_contribution(light, surface))
                    .sum::<Vec3>();
                if let Some(directional) = lights.directional() {
                    contribution += directional_contribution(directional, surface);
                }
                surface.albedo * (contribution + self.ambient)
            }
            RenderMode::LightHeatmap => {
                let count = tile_lights.count() as f32;
                Vec3::splat(count / self.heatmap_scale + self.ambient)
            }
            RenderMode::Normals => surface.normal * 0.5 + 0.5,
            RenderMode::Uvs => surface.uv.fract().extend(0.0),
            RenderMode::Albedo => surface.albedo,
        }
    }

    /// Shades the frame row by row.
    pub fn shade(
        &self,
        grid: &TileGrid,
        surfaces: &SurfaceBuffer,
        visible: &VisibleLightIndexBuffer,
        lights: &LightSnapshot,
        mode: RenderMode,
        output: &mut ColorBuffer,
    ) -> RenderResult<()> {
        let viewport = (grid.width(), grid.height());
        if (surfaces.width, surfaces.height) != viewport || (output.width, output.height) != viewport
        {
            return Err(RenderError::Configuration(format!(
                "shading buffers ({}x{} surfaces, {}x{} output) do not match the {}x{} viewport",
                surfaces.width, surfaces.height, output.width, output.height, viewport.0, viewport.1
            )));
        }
        visible.ensure_matches(grid)?;

        let width = grid.width() as usize;
        output
            .data
            .par_chunks_mut(width)
            .zip(surfaces.data.par_chunks(width))
            .enumerate()
            .for_each(|(y, (out_row, surface_row))| {
                for (x, (out, surface)) in out_row.iter_mut().zip(surface_row).enumerate() {
                    *out = match surface {
                        Some(surface) => {
                            let tile = grid.tile_index_for(x as u32, y as u32);
                            self.shade_surface(surface, visible.tile_lights(tile), lights, mode)
                        }
                        None => self.clear_color,
                    };
                }
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_at(position: Vec3) -> Surface {
        Surface {
            world_position: position,
            normal: Vec3::Y,
            uv: Vec2::new(1.25, 0.5),
            albedo: Vec3::new(1.0, 0.5, 0.25),
        }
    }

    fn snapshot(lights: Vec<PointLight>) -> LightSnapshot {
        LightSnapshot::from_lights(lights, None)
    }

    #[test]
    fn contribution_falls_off_linearly_to_radius() {
        let light = PointLight::new(Vec3::new(0.0, 5.0, 0.0), Vec3::ONE, 2.0, 10.0);
        let lit = point_light_contribution(&light, &floor_at(Vec3::ZERO));
        assert!((lit - Vec3::splat(1.0)).abs().max_element() < 1e-6);

        let beyond = point_light_contribution(&light, &floor_at(Vec3::new(20.0, 0.0, 0.0)));
        assert_eq!(beyond, Vec3::ZERO);
    }

    #[test]
    fn light_below_the_surface_contributes_nothing() {
        let light = PointLight::new(Vec3::new(0.0, -1.0, 0.0), Vec3::ONE, 1.0, 10.0);
        assert_eq!(point_light_contribution(&light, &floor_at(Vec3::ZERO)), Vec3::ZERO);
    }

    #[test]
    fn zero_distance_light_is_not_nan() {
        let light = PointLight::new(Vec3::ZERO, Vec3::ONE, 1.0, 10.0);
        let color = point_light_contribution(&light, &floor_at(Vec3::ZERO));
        assert_eq!(color, Vec3::ZERO);
    }

    #[test]
    fn lit_mode_adds_ambient_and_directional() {
        let stage = ShadingStage::default();
        let surface = floor_at(Vec3::ZERO);
        let lights = LightSnapshot::from_lights(
            Vec::new(),
            Some(DirectionalLight::new(Vec3::NEG_Y, Vec3::ONE, 0.4)),
        );

        let color = stage.shade_surface(&surface, std::iter::empty(), &lights, RenderMode::Lit);
        let expected = surface.albedo * 0.5;
        assert!((color - expected).abs().max_element() < 1e-6);
    }

    #[test]
    fn heatmap_counts_tile_lights() {
        let stage = ShadingStage::default();
        let lights = snapshot(vec![PointLight::default(); 4]);
        let color = stage.shade_surface(
            &floor_at(Vec3::ZERO),
            [0, 1, 2].into_iter(),
            &lights,
            RenderMode::LightHeatmap,
        );
        assert!((color - Vec3::splat(0.85)).abs().max_element() < 1e-6);
    }

    #[test]
    fn debug_modes_ignore_lights() {
        let stage = ShadingStage::default();
        let surface = floor_at(Vec3::ZERO);
        let lights = snapshot(Vec::new());
        let shade = |mode| stage.shade_surface(&surface, std::iter::empty(), &lights, mode);

        assert_eq!(shade(RenderMode::Normals), Vec3::new(0.5, 1.0, 0.5));
        assert_eq!(shade(RenderMode::Uvs), Vec3::new(0.25, 0.5, 0.0));
        assert_eq!(shade(RenderMode::Albedo), surface.albedo);
    }

    #[test]
    fn shade_uses_the_pixel_tile_list() {
        let grid = TileGrid::new(32, 16).unwrap();
        let mut surfaces = SurfaceBuffer::new(32, 16);
        surfaces.set(2, 2, Some(floor_at(Vec3::ZERO)));
        surfaces.set(20, 2, Some(floor_at(Vec3::ZERO)));

        // Only tile 0 lists the light.
        let visible = VisibleLightIndexBuffer::from_raw(2, vec![0, -1, -1, -1]);
        let lights = snapshot(vec![PointLight::new(Vec3::new(0.0, 5.0, 0.0), Vec3::ONE, 2.0, 10.0)]);
        let stage = ShadingStage {
            clear_color: Vec3::new(0.0, 0.0, 1.0),
            ..ShadingStage::default()
        };

        let mut output = ColorBuffer::new(32, 16);
        stage
            .shade(&grid, &surfaces, &visible, &lights, RenderMode::Lit, &mut output)
            .unwrap();

        let albedo = floor_at(Vec3::ZERO).albedo;
        assert!((output.get(2, 2) - albedo * 1.1).abs().max_element() < 1e-6);
        assert!((output.get(20, 2) - albedo * 0.1).abs().max_element() < 1e-6);
        assert_eq!(output.get(0, 0), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn mismatched_output_is_a_configuration_error() {
        let grid = TileGrid::new(32, 16).unwrap();
        let visible = VisibleLightIndexBuffer::new(&grid, 2).unwrap();
        let result = ShadingStage::default().shade(
            &grid,
            &SurfaceBuffer::new(32, 16),
            &visible,
            &snapshot(Vec::new()),
            RenderMode::Lit,
            &mut ColorBuffer::new(16, 16),
        );
        assert!(matches!(result, Err(RenderError::Configuration(_))));
    }

    #[test]
    fn rgba_output_is_clamped() {
        let mut output = ColorBuffer::new(1, 1);
        output.data[0] = Vec3::new(2.0, -1.0, 0.5);
        assert_eq!(output.to_rgba8(), vec![255, 0, 128, 255]);
    }
}
