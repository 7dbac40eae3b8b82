use crate::{
    error::{RenderError, RenderResult},
    tile_grid::TileGrid,
};

/// Terminates a tile's list when it holds fewer than `max_per_tile` lights.
pub const SENTINEL: i32 = -1;

/// Flat per-tile light lists: tile `t` owns
/// `[t * max_per_tile, (t + 1) * max_per_tile)`.
#[derive(Clone, Debug, PartialEq)]
pub struct VisibleLightIndexBuffer {
    max_per_tile: usize,
    data: Vec<i32>,
}

impl VisibleLightIndexBuffer {
    pub fn new(grid: &TileGrid, max_per_tile: usize) -> RenderResult<Self> {
        Ok(Self {
            max_per_tile,
            data: vec![SENTINEL; grid.visible_index_len(max_per_tile)?],
        })
    }

    /// Wraps an externally sized buffer; length is checked at cull time.
    pub fn from_raw(max_per_tile: usize, data: Vec<i32>) -> Self {
        Self { max_per_tile, data }
    }

    pub fn max_per_tile(&self) -> usize {
        self.max_per_tile
    }

    pub fn tile_count(&self) -> usize {
        if self.max_per_tile == 0 {
            0
        } else {
            self.data.len() / self.max_per_tile
        }
    }

    /// Reallocates for `grid`; left untouched when the size is rejected.
    pub fn resize(&mut self, grid: &TileGrid) -> RenderResult<()> {
        let len = grid.visible_index_len(self.max_per_tile)?;
        self.data.clear();
        self.data.resize(len, SENTINEL);
        Ok(())
    }

    pub fn ensure_matches(&self, grid: &TileGrid) -> RenderResult<()> {
        let expected = grid.visible_index_len(self.max_per_tile)?;
        if self.max_per_tile == 0 || self.data.len() != expected {
            return Err(RenderError::Configuration(format!(
                "visible index buffer holds {} entries, {} tiles x {} slots needs {expected}",
                self.data.len(),
                grid.tile_count(),
                self.max_per_tile
            )));
        }
        Ok(())
    }

    pub fn tile_slots(&self, tile_index: usize) -> &[i32] {
        let start = tile_index * self.max_per_tile;
        &self.data[start..start + self.max_per_tile]
    }

    /// Light indices of one tile, up to the sentinel.
    pub fn tile_lights(&self, tile_index: usize) -> impl Iterator<Item = usize> + '_ {
        self.tile_slots(tile_index)
            .iter()
            .take_while(|&&index| index != SENTINEL)
            .map(|&index| index as usize)
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [i32] {
        &mut self.data
    }

    /// Raw bytes in upload order.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sized_from_the_grid() {
        let grid = TileGrid::new(1920, 1080).unwrap();
        let buffer = VisibleLightIndexBuffer::new(&grid, 1024).unwrap();
        assert_eq!(buffer.as_slice().len(), 8160 * 1024);
        assert_eq!(buffer.tile_count(), 8160);
        assert!(buffer.ensure_matches(&grid).is_ok());
        assert_eq!(buffer.as_bytes().len(), 8160 * 1024 * 4);
    }

    #[test]
    fn tile_lights_stop_at_sentinel() {
        let buffer = VisibleLightIndexBuffer::from_raw(4, vec![3, 0, SENTINEL, 7, 1, 2, 5, 6]);
        assert_eq!(buffer.tile_lights(0).collect::<Vec<_>>(), vec![3, 0]);
        // a full range has no sentinel
        assert_eq!(buffer.tile_lights(1).collect::<Vec<_>>(), vec![1, 2, 5, 6]);
    }

    #[test]
    fn stale_buffer_is_rejected_until_resized() {
        let small = TileGrid::new(32, 32).unwrap();
        let large = TileGrid::new(64, 32).unwrap();
        let mut buffer = VisibleLightIndexBuffer::new(&small, 8).unwrap();
        assert!(matches!(
            buffer.ensure_matches(&large),
            Err(RenderError::Configuration(_))
        ));
        buffer.resize(&large).unwrap();
        assert!(buffer.ensure_matches(&large).is_ok());
    }
}
