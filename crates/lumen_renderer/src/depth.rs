use lumen_core::CameraMatrices;

use crate::{
    error::{RenderError, RenderResult},
    tile_grid::{TileGrid, TileRect},
};

/// Depth written where no geometry was rasterized.
pub const CLEAR_DEPTH: f32 = 1.0;

/// Per-pixel NDC depth in `[0, 1]`, row 0 at the top of the screen.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthBuffer {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl DepthBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![CLEAR_DEPTH; width as usize * height as usize],
        }
    }

    pub fn from_data(width: u32, height: u32, data: Vec<f32>) -> RenderResult<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(RenderError::Configuration(format!(
                "depth data holds {} samples, {width}x{height} needs {expected}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn clear(&mut self) {
        self.data.fill(CLEAR_DEPTH);
    }

    /// Reallocates to a new viewport, cleared.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(width as usize * height as usize, CLEAR_DEPTH);
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, depth: f32) {
        self.data[y as usize * self.width as usize + x as usize] = depth;
    }

    pub fn ensure_matches(&self, grid: &TileGrid) -> RenderResult<()> {
        if self.width != grid.width() || self.height != grid.height() {
            return Err(RenderError::Configuration(format!(
                "depth buffer is {}x{} but the viewport is {}x{}",
                self.width,
                self.height,
                grid.width(),
                grid.height()
            )));
        }
        Ok(())
    }

    /// Min/max depth over the rectangle, ignoring cleared pixels.
    /// `None` when nothing was drawn there.
    pub fn bounds_in(&self, rect: TileRect) -> Option<(f32, f32)> {
        let mut bounds: Option<(f32, f32)> = None;
        for y in rect.y0..rect.y1 {
            let row = y as usize * self.width as usize;
            for &depth in &self.data[row + rect.x0 as usize..row + rect.x1 as usize] {
                if depth >= CLEAR_DEPTH {
                    continue;
                }
                bounds = Some(match bounds {
                    Some((min, max)) => (min.min(depth), max.max(depth)),
                    None => (depth, depth),
                });
            }
        }
        bounds
    }

    /// View distance for every pixel, divided by `far` so it fits `[0, 1]`.
    pub fn linearized(&self, near: f32, far: f32) -> Vec<f32> {
        self.data
            .iter()
            .map(|&depth| linear_depth(depth, near, far) / far)
            .collect()
    }
}

/// Inverts the `[0, 1]` right-handed perspective depth mapping.
pub fn linear_depth(ndc_depth: f32, near: f32, far: f32) -> f32 {
    near * far / (far - ndc_depth * (far - near))
}

/// Source of the per-frame depth buffer (the depth pre-pass).
pub trait DepthProvider {
    /// Overwrites every pixel of `depth` for the given camera.
    fn render_depth(&self, camera: &CameraMatrices, depth: &mut DepthBuffer);
}
