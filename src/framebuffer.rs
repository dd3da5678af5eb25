use rayon::prelude::*;

use crate::tile::{Tile, TileGrid, TILE_SIZE};

/// DirectX standard sample patterns, in 1/16-pixel units relative to the
/// pixel origin. Every position is exactly representable in the 4-bit
/// sub-pixel fixed-point grid.
const SAMPLES_1X: [(i32, i32); 1] = [(8, 8)];
const SAMPLES_2X: [(i32, i32); 2] = [(12, 12), (4, 4)];
const SAMPLES_4X: [(i32, i32); 4] = [(6, 2), (14, 6), (2, 10), (10, 14)];
const SAMPLES_8X: [(i32, i32); 8] = [
    (9, 5),
    (7, 11),
    (13, 9),
    (5, 3),
    (3, 13),
    (1, 7),
    (11, 15),
    (15, 1),
];
const SAMPLES_16X: [(i32, i32); 16] = [
    (9, 9),
    (7, 5),
    (5, 10),
    (12, 7),
    (3, 6),
    (10, 13),
    (13, 11),
    (11, 3),
    (6, 14),
    (8, 1),
    (4, 2),
    (2, 12),
    (0, 8),
    (15, 4),
    (14, 15),
    (1, 0),
];

/// Sub-pixel sample offsets for a multisample level (log2 of the count).
pub fn sample_positions(level: u32) -> &'static [(i32, i32)] {
    match level {
        0 => &SAMPLES_1X,
        1 => &SAMPLES_2X,
        2 => &SAMPLES_4X,
        3 => &SAMPLES_8X,
        4 => &SAMPLES_16X,
        _ => unreachable!("msaa level validated at the boundary"),
    }
}

/// The resolved, presentable color buffer. The per-sample storage lives in
/// the tiles; this is what `back_buffer()` exposes.
pub struct FrameBuffer {
    width: u32,
    height: u32,
    resolved: Vec<u8>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        FrameBuffer {
            width,
            height,
            resolved: vec![0; (width * height * 4) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resolved RGBA8, row-major from the top-left.
    pub fn as_bytes(&self) -> &[u8] {
        &self.resolved
    }

    /// Box-filter resolve: every pixel becomes the rounded mean of its
    /// samples. Row-parallel; the tiles are only read.
    pub fn resolve(&mut self, grid: &TileGrid) {
        let width = self.width as usize;
        let sample_count = grid.sample_count;
        let half = sample_count as u32 / 2;
        self.resolved
            .par_chunks_mut(width * 4)
            .enumerate()
            .for_each(|(y, row)| {
                let y = y as i32;
                let tile_row = y / TILE_SIZE * grid.tiles_x;
                for x in 0..width as i32 {
                    let tile = &grid.tiles[(tile_row + x / TILE_SIZE) as usize];
                    let base = tile.quad_base(x & !1, y & !1, 0, sample_count);
                    let lane = Tile::lane_of(x, y);
                    let mut sum = [0u32; 3];
                    for s in 0..sample_count {
                        let c = tile.color[base + s * 4 + lane];
                        sum[0] += c[0] as u32;
                        sum[1] += c[1] as u32;
                        sum[2] += c[2] as u32;
                    }
                    let out = &mut row[x as usize * 4..x as usize * 4 + 4];
                    out[0] = ((sum[0] + half) / sample_count as u32) as u8;
                    out[1] = ((sum[1] + half) / sample_count as u32) as u8;
                    out[2] = ((sum[2] + half) / sample_count as u32) as u8;
                    out[3] = 255;
                }
            });
    }
}

/// Framebuffer-update stage for one tile: scatter each fragment's shaded
/// quad into the sample color store under its coverage mask, in fragment
/// append order.
pub fn update_tile(tile: &mut Tile, results: &[[[u8; 4]; 4]], sample_count: usize) {
    for f in &tile.frags {
        let shaded = &results[f.intra as usize];
        let base = tile.quad_base(f.x as i32, f.y as i32, 0, sample_count);
        for s in 0..sample_count {
            let quad = f.coverage.quad(s);
            if !quad.any() {
                continue;
            }
            for lane in 0..4 {
                if quad.test(lane) {
                    tile.color[base + s * 4 + lane] = shaded[lane];
                }
            }
        }
    }
}
