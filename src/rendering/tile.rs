/// Tile grid and conservative face binning.
///
/// The output image is partitioned into fixed 128x128 tiles, the unit of
/// parallel work. Binning maps each visible face's screen bounding box onto
/// every tile it may touch; a face can appear in several bins, but each
/// pixel belongs to exactly one tile, so tiles never contend.
use crate::rendering::framebuffer::PixelRect;

/// Tile edge length in pixels.
pub const TILE_SIZE: usize = 128;

/// Per-tile face list cap; overflow faces are dropped for that tile only.
pub const MAX_FACES_PER_TILE: usize = 16_384;

/// Per-tile lists of face ids, kept in depth-sorted submission order.
/// Bin vectors are reused across frames to avoid reallocation.
#[derive(Clone, Debug, Default)]
pub struct TileBins {
    pub tiles_x: usize,
    pub tiles_y: usize,
    width: usize,
    height: usize,
    bins: Vec<Vec<u32>>,
}

impl TileBins {
    pub fn new(width: usize, height: usize) -> Self {
        let mut bins = Self::default();
        bins.reset(width, height);
        bins
    }

    /// Prepare for a new frame at the given resolution: resize the grid if
    /// needed and clear every face list (capacity is retained).
    pub fn reset(&mut self, width: usize, height: usize) {
        self.tiles_x = width.div_ceil(TILE_SIZE);
        self.tiles_y = height.div_ceil(TILE_SIZE);
        self.width = width;
        self.height = height;
        self.bins.resize(self.tiles_x * self.tiles_y, Vec::new());
        for bin in &mut self.bins {
            bin.clear();
        }
    }

    #[inline]
    pub fn tile_count(&self) -> usize {
        self.tiles_x * self.tiles_y
    }

    /// Pixel rectangle of a tile, clamped to the image edge.
    #[inline]
    pub fn tile_rect(&self, tile: usize) -> PixelRect {
        let tx = tile % self.tiles_x;
        let ty = tile / self.tiles_x;
        let x0 = tx * TILE_SIZE;
        let y0 = ty * TILE_SIZE;
        PixelRect {
            x0,
            y0,
            x1: (x0 + TILE_SIZE).min(self.width),
            y1: (y0 + TILE_SIZE).min(self.height),
        }
    }

    #[inline]
    pub fn faces(&self, tile: usize) -> &[u32] {
        &self.bins[tile]
    }

    /// Bin every face of `sorted_ids` (already depth-ordered) into the
    /// tiles its screen bounding box overlaps. Conservative: a face may
    /// land in a tile it only grazes, never misses one it touches.
    pub fn bin_faces(&mut self, screen: &[f32], indices: &[u32], sorted_ids: &[u32]) {
        let tiles_x = self.tiles_x as i64;
        let tiles_y = self.tiles_y as i64;

        for &face in sorted_ids {
            let i3 = face as usize * 3;
            let b0 = indices[i3] as usize * 4;
            let b1 = indices[i3 + 1] as usize * 4;
            let b2 = indices[i3 + 2] as usize * 4;

            let min_x = screen[b0].min(screen[b1]).min(screen[b2]);
            let max_x = screen[b0].max(screen[b1]).max(screen[b2]);
            let min_y = screen[b0 + 1].min(screen[b1 + 1]).min(screen[b2 + 1]);
            let max_y = screen[b0 + 1].max(screen[b1 + 1]).max(screen[b2 + 1]);

            let min_tx = ((min_x / TILE_SIZE as f32) as i64).max(0);
            let max_tx = ((max_x / TILE_SIZE as f32) as i64).min(tiles_x - 1);
            let min_ty = ((min_y / TILE_SIZE as f32) as i64).max(0);
            let max_ty = ((max_y / TILE_SIZE as f32) as i64).min(tiles_y - 1);

            for ty in min_ty..=max_ty {
                for tx in min_tx..=max_tx {
                    let bin = &mut self.bins[(ty * tiles_x + tx) as usize];
                    if bin.len() < MAX_FACES_PER_TILE {
                        bin.push(face);
                    }
                }
            }
        }
    }
}
