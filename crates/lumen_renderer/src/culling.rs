use glam::Vec3;
use lumen_core::CameraMatrices;
use lumen_lights::LightSnapshot;
use rayon::prelude::*;

use crate::{
    depth::DepthBuffer,
    error::{RenderError, RenderResult},
    frustum::TileFrustum,
    tile_grid::TileGrid,
    visible_indices::{SENTINEL, VisibleLightIndexBuffer},
};

/// Light bounding sphere in view space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewLight {
    pub center: Vec3,
    pub radius: f32,
}

/// Outcome of culling one tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileCullResult {
    /// Indices actually written.
    pub written: usize,
    /// Visible lights that did not fit.
    pub dropped: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CullStats {
    pub tiles: usize,
    pub total_visible: usize,
    pub max_in_tile: usize,
    pub overflowed_tiles: usize,
}

impl CullStats {
    fn from_tile(tile: TileCullResult) -> Self {
        Self {
            tiles: 1,
            total_visible: tile.written,
            max_in_tile: tile.written,
            overflowed_tiles: usize::from(tile.dropped > 0),
        }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            tiles: self.tiles + other.tiles,
            total_visible: self.total_visible + other.total_visible,
            max_in_tile: self.max_in_tile.max(other.max_in_tile),
            overflowed_tiles: self.overflowed_tiles + other.overflowed_tiles,
        }
    }
}

/// Tests every light against one tile and fills its slot range.
///
/// Indices are written in ascending order through a counter private to the
/// tile. Writes never go past `slots.len()`; when the range is not full the
/// next slot receives [`SENTINEL`].
pub fn cull_tile(frustum: &TileFrustum, lights: &[ViewLight], slots: &mut [i32]) -> TileCullResult {
    let mut result = TileCullResult::default();

    for (index, light) in lights.iter().enumerate() {
        if !frustum.sphere_visible(light.center, light.radius) {
            continue;
        }
        match slots.get_mut(result.written) {
            Some(slot) => {
                *slot = index as i32;
                result.written += 1;
            }
            None => result.dropped += 1,
        }
    }

    if let Some(slot) = slots.get_mut(result.written) {
        *slot = SENTINEL;
    }
    result
}

/// Builds the per-tile visible light lists for a frame.
#[derive(Clone, Copy, Debug)]
pub struct LightCuller {
    max_lights_per_tile: usize,
}

impl LightCuller {
    pub fn new(max_lights_per_tile: usize) -> Self {
        Self {
            max_lights_per_tile,
        }
    }

    pub fn max_lights_per_tile(&self) -> usize {
        self.max_lights_per_tile
    }

    /// Rewrites `visible` for the current frame. Nothing is written when the
    /// buffers do not match `grid`.
    pub fn cull(
        &self,
        grid: &TileGrid,
        camera: &CameraMatrices,
        depth: &DepthBuffer,
        lights: &LightSnapshot,
        visible: &mut VisibleLightIndexBuffer,
    ) -> RenderResult<CullStats> {
        if self.max_lights_per_tile == 0 {
            return Err(RenderError::Configuration(
                "max_lights_per_tile must be positive".into(),
            ));
        }
        if visible.max_per_tile() != self.max_lights_per_tile {
            return Err(RenderError::Configuration(format!(
                "visible index buffer has {} slots per tile, culler expects {}",
                visible.max_per_tile(),
                self.max_lights_per_tile
            )));
        }
        visible.ensure_matches(grid)?;
        depth.ensure_matches(grid)?;
        if lights.count() > i32::MAX as usize {
            return Err(RenderError::Configuration(format!(
                "{} lights cannot be indexed with i32",
                lights.count()
            )));
        }

        let view_lights: Vec<ViewLight> = lights
            .point_lights()
            .iter()
            .map(|light| ViewLight {
                center: camera.view.transform_point3(light.position),
                radius: light.radius,
            })
            .collect();

        let inverse_projection = camera.inverse_projection;
        let viewport = (grid.width(), grid.height());

        let stats = visible
            .data_mut()
            .par_chunks_mut(self.max_lights_per_tile)
            .enumerate()
            .map(|(tile_index, slots)| {
                let rect = grid.tile_rect(tile_index);
                let frustum =
                    TileFrustum::new(inverse_projection, viewport, rect, depth.bounds_in(rect));
                CullStats::from_tile(cull_tile(&frustum, &view_lights, slots))
            })
            .reduce(CullStats::default, CullStats::merge);

        if stats.overflowed_tiles > 0 {
            log::debug!(
                "{} tiles exceeded {} lights; extra lights were dropped",
                stats.overflowed_tiles,
                self.max_lights_per_tile
            );
        }
        Ok(stats)
    }
}
