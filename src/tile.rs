use glam::IVec2;

use crate::fragment::QuadFragment;
use crate::math::SUBPIXEL_BITS;
use crate::state::FrameStats;
use crate::triangle::RasterTriangle;

pub const TILE_SIZE_LOG2: u32 = 6;
pub const TILE_SIZE: i32 = 1 << TILE_SIZE_LOG2;
/// Tile span in fixed-point units.
pub const TILE_SIZE_FX: i32 = TILE_SIZE << SUBPIXEL_BITS;
const QUADS_PER_ROW: i32 = TILE_SIZE / 2;

/// A screen tile: the unit of rasterization work and the owner of the
/// color/depth sample storage for its pixels.
///
/// Samples are stored quad-swizzled: the four pixels of a 2x2 quad sit in
/// adjacent lanes, so the fine rasterizer and the framebuffer update touch
/// contiguous memory per (quad, sample) pair.
pub struct Tile {
    pub id: u32,
    /// Top-left pixel, tile-aligned.
    pub min: IVec2,
    /// Exclusive max, clamped to the framebuffer.
    pub max: IVec2,
    pub color: Vec<[u8; 4]>,
    pub depth: Vec<f32>,
    pub frags: Vec<QuadFragment>,
}

impl Tile {
    fn new(id: u32, min: IVec2, max: IVec2, sample_count: usize) -> Self {
        let samples = (TILE_SIZE * TILE_SIZE) as usize * sample_count;
        Tile {
            id,
            min,
            max,
            color: vec![[0; 4]; samples],
            depth: vec![f32::INFINITY; samples],
            frags: Vec::new(),
        }
    }

    /// Index of the first lane of the (quad, sample) group holding pixel
    /// (qx, qy) .. (qx+1, qy+1). `qx`/`qy` are absolute even pixel coords.
    #[inline]
    pub fn quad_base(&self, qx: i32, qy: i32, sample: usize, sample_count: usize) -> usize {
        let lx = (qx - self.min.x) >> 1;
        let ly = (qy - self.min.y) >> 1;
        ((ly * QUADS_PER_ROW + lx) as usize * sample_count + sample) * 4
    }

    /// Lane of a pixel within its quad: TL, TR, BL, BR.
    #[inline]
    pub fn lane_of(x: i32, y: i32) -> usize {
        ((y & 1) << 1 | (x & 1)) as usize
    }

    pub fn clear(&mut self, clear_color: [u8; 4]) {
        self.color.fill(clear_color);
        self.depth.fill(f32::INFINITY);
        self.frags.clear();
    }
}

/// The screen's tile grid. Rebuilt on resize and on MSAA changes.
pub struct TileGrid {
    pub tiles: Vec<Tile>,
    pub tiles_x: i32,
    pub tiles_y: i32,
    pub width: u32,
    pub height: u32,
    pub sample_count: usize,
}

impl TileGrid {
    pub fn new(width: u32, height: u32, sample_count: usize) -> Self {
        let tiles_x = (width as i32 + TILE_SIZE - 1) / TILE_SIZE;
        let tiles_y = (height as i32 + TILE_SIZE - 1) / TILE_SIZE;
        let mut tiles = Vec::with_capacity((tiles_x * tiles_y) as usize);
        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                let min = IVec2::new(tx * TILE_SIZE, ty * TILE_SIZE);
                let max = (min + TILE_SIZE).min(IVec2::new(width as i32, height as i32));
                tiles.push(Tile::new((ty * tiles_x + tx) as u32, min, max, sample_count));
            }
        }
        TileGrid {
            tiles,
            tiles_x,
            tiles_y,
            width,
            height,
            sample_count,
        }
    }

    /// Total sample storage in bytes, color plus depth.
    pub fn sample_buffer_bytes(&self) -> usize {
        self.tiles
            .iter()
            .map(|t| t.color.len() * 4 + t.depth.len() * 4)
            .sum()
    }
}

/// A triangle's membership in one tile. `accept` holds one bit per edge:
/// set means every sample of the tile is inside that edge, so fine
/// rasterization can skip its test. Only `big` triangles carry accept bits;
/// small ones take the cheap path and always run full edge tests.
#[derive(Clone, Copy, Debug)]
pub struct TriangleRef {
    pub tri: u32,
    pub accept: u8,
    pub big: bool,
}

pub const ACCEPT_ALL: u8 = 0b111;

/// Binning for one worker's triangle buffer: returns a per-tile reference
/// list. Each worker bins into its own lists, so no tile is written
/// concurrently; the rasterizer later reads them in worker order.
pub fn bin_worker(tris: &[RasterTriangle], grid: &TileGrid, stats: &mut FrameStats) -> Vec<Vec<TriangleRef>> {
    let mut refs: Vec<Vec<TriangleRef>> = vec![Vec::new(); grid.tiles.len()];
    let shift = TILE_SIZE_LOG2 + SUBPIXEL_BITS;

    for (ti, tri) in tris.iter().enumerate() {
        let (min, max) = tri.bbox();
        let t0 = IVec2::new(min.x >> shift, min.y >> shift)
            .clamp(IVec2::ZERO, IVec2::new(grid.tiles_x - 1, grid.tiles_y - 1));
        let t1 = IVec2::new(max.x >> shift, max.y >> shift)
            .clamp(IVec2::ZERO, IVec2::new(grid.tiles_x - 1, grid.tiles_y - 1));

        let small = t1.x - t0.x <= 1 && t1.y - t0.y <= 1;
        for ty in t0.y..=t1.y {
            for tx in t0.x..=t1.x {
                let tile = (ty * grid.tiles_x + tx) as usize;
                if small {
                    refs[tile].push(TriangleRef {
                        tri: ti as u32,
                        accept: 0,
                        big: false,
                    });
                    stats.tile_refs += 1;
                    continue;
                }

                let tile_min_fx = IVec2::new(tx << shift, ty << shift);
                let mut rejected = false;
                let mut accept = 0u8;
                for i in 0..3 {
                    if tri.rejects_block(i, tile_min_fx, TILE_SIZE_FX) {
                        rejected = true;
                        break;
                    }
                    if tri.accepts_block(i, tile_min_fx, TILE_SIZE_FX) {
                        accept |= 1 << i;
                    }
                }
                if rejected {
                    continue;
                }
                refs[tile].push(TriangleRef {
                    tri: ti as u32,
                    accept,
                    big: true,
                });
                stats.tile_refs += 1;
            }
        }
    }
    refs
}
