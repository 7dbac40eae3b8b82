use crate::error::{RenderError, RenderResult};

/// Edge length of a screen tile in pixels.
pub const TILE_SIZE: u32 = 16;

/// Pixel rectangle `[x0, x1) x [y0, y1)` covered by one tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl TileRect {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tiles_x: u32,
    tiles_y: u32,
}

impl TileGrid {
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::Configuration(format!(
                "viewport must be non-empty, got {width}x{height}"
            )));
        }

        Ok(Self {
            width,
            height,
            tiles_x: width.div_ceil(TILE_SIZE),
            tiles_y: height.div_ceil(TILE_SIZE),
        })
    }

    /// Returns true when the tile count changed and dependent buffers must
    /// be reallocated.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<bool> {
        let resized = Self::new(width, height)?;
        let changed = resized.tile_count() != self.tile_count();
        *self = resized;

        log::info!(
            "Tile grid resized to {}x{} tiles for {width}x{height}",
            self.tiles_x,
            self.tiles_y
        );
        Ok(changed)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tiles_x(&self) -> u32 {
        self.tiles_x
    }

    pub fn tiles_y(&self) -> u32 {
        self.tiles_y
    }

    pub fn tile_count(&self) -> usize {
        self.tiles_x as usize * self.tiles_y as usize
    }

    /// Entries a visible index buffer needs for this grid. Fails when the
    /// buffer could not be addressed in memory.
    pub fn visible_index_len(&self, max_lights_per_tile: usize) -> RenderResult<usize> {
        self.tile_count()
            .checked_mul(max_lights_per_tile)
            .filter(|&len| {
                len.checked_mul(std::mem::size_of::<i32>())
                    .is_some_and(|bytes| bytes <= isize::MAX as usize)
            })
            .ok_or_else(|| {
                RenderError::Configuration(format!(
                    "{} tiles x {max_lights_per_tile} lights per tile overflows the index buffer",
                    self.tile_count()
                ))
            })
    }

    pub fn tile_index_for(&self, pixel_x: u32, pixel_y: u32) -> usize {
        let tile_x = pixel_x / TILE_SIZE;
        let tile_y = pixel_y / TILE_SIZE;
        tile_y as usize * self.tiles_x as usize + tile_x as usize
    }

    pub fn tile_coords(&self, tile_index: usize) -> (u32, u32) {
        let tiles_x = self.tiles_x as usize;
        ((tile_index % tiles_x) as u32, (tile_index / tiles_x) as u32)
    }

    /// Pixel rectangle of a tile, clamped so the last row and column only
    /// cover the pixels that exist.
    pub fn tile_rect(&self, tile_index: usize) -> TileRect {
        let (tile_x, tile_y) = self.tile_coords(tile_index);
        let x0 = tile_x * TILE_SIZE;
        let y0 = tile_y * TILE_SIZE;
        TileRect {
            x0,
            y0,
            x1: (x0 + TILE_SIZE).min(self.width),
            y1: (y0 + TILE_SIZE).min(self.height),
        }
    }
}
