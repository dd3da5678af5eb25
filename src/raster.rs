use std::simd::cmp::SimdPartialOrd;
use std::simd::num::SimdInt;
use std::simd::Select;

use glam::IVec2;

use crate::clip::WorkerOutput;
use crate::fragment::{CoverageMask, QuadFragment};
use crate::math::{FX_ONE, SUBPIXEL_BITS};
use crate::simd_config::{F32x4, I32x4, I64x4, QUAD_X, QUAD_Y};
use crate::state::{FrameStats, RenderState};
use crate::tile::{Tile, TriangleRef, ACCEPT_ALL, TILE_SIZE};
use crate::triangle::RasterTriangle;

/// Blocks below this size stop the hierarchical descent and go straight to
/// per-quad sampling.
const FINE_BLOCK: i32 = 8;

/// Rasterize one tile: walk every worker's reference list in worker order
/// (within a worker, clip-emission order), so depth testing sees triangles
/// in submission order.
pub fn rasterize_tile(
    tile: &mut Tile,
    bins: &[Vec<Vec<TriangleRef>>],
    workers: &[WorkerOutput],
    state: &RenderState,
    samples: &[(i32, i32)],
) -> FrameStats {
    let mut stats = FrameStats::default();
    for (k, worker_bins) in bins.iter().enumerate() {
        for r in &worker_bins[tile.id as usize] {
            let tri = &workers[k].tris[r.tri as usize];
            if r.accept == ACCEPT_ALL {
                // Every sample of the tile is inside all three edges: flood
                // the whole tile, depth test only.
                walk_rect(
                    tile, tri, k as u32, tile.min, tile.max, ACCEPT_ALL, state, samples, &mut stats,
                );
            } else if r.big && state.hierarchical_rasterize {
                descend(
                    tile, tri, k as u32, tile.min, TILE_SIZE, r.accept, state, samples, &mut stats,
                );
            } else {
                // Small triangles (and the non-hierarchical path) sample the
                // bbox-tile intersection directly.
                let (min, max) = tri.bbox();
                let lo = tile.min.max(IVec2::new(min.x >> SUBPIXEL_BITS, min.y >> SUBPIXEL_BITS));
                let hi = tile
                    .max
                    .min(IVec2::new((max.x >> SUBPIXEL_BITS) + 1, (max.y >> SUBPIXEL_BITS) + 1));
                walk_rect(tile, tri, k as u32, lo, hi, r.accept, state, samples, &mut stats);
            }
        }
    }
    stats
}

/// Coarse rasterization: split the block in half repeatedly, dropping any
/// sub-block whose reject corner fails an edge, until fine-block size.
#[allow(clippy::too_many_arguments)]
fn descend(
    tile: &mut Tile,
    tri: &RasterTriangle,
    worker: u32,
    block_min: IVec2,
    size: i32,
    accept: u8,
    state: &RenderState,
    samples: &[(i32, i32)],
    stats: &mut FrameStats,
) {
    if size == FINE_BLOCK {
        let hi = tile.max.min(block_min + size);
        walk_rect(tile, tri, worker, block_min, hi, accept, state, samples, stats);
        return;
    }

    let half = size / 2;
    for dy in 0..2 {
        for dx in 0..2 {
            let child = block_min + IVec2::new(dx * half, dy * half);
            if child.x >= tile.max.x || child.y >= tile.max.y {
                continue;
            }
            let child_fx = child * FX_ONE;
            let rejected = (0..3).any(|i| {
                accept & (1 << i) == 0 && tri.rejects_block(i, child_fx, half * FX_ONE)
            });
            if !rejected {
                descend(tile, tri, worker, child, half, accept, state, samples, stats);
            }
        }
    }
}

/// Fine rasterization over every quad of a pixel rectangle
/// (`lo` inclusive, `hi` exclusive).
#[allow(clippy::too_many_arguments)]
fn walk_rect(
    tile: &mut Tile,
    tri: &RasterTriangle,
    worker: u32,
    lo: IVec2,
    hi: IVec2,
    accept: u8,
    state: &RenderState,
    samples: &[(i32, i32)],
    stats: &mut FrameStats,
) {
    if lo.x >= hi.x || lo.y >= hi.y {
        return;
    }
    let mut qy = lo.y & !1;
    while qy < hi.y {
        let mut qx = lo.x & !1;
        while qx < hi.x {
            fine_quad(tile, tri, worker, qx, qy, accept, state, samples, stats);
            qx += 2;
        }
        qy += 2;
    }
}

#[inline]
fn edge_quad(tri: &RasterTriangle, i: usize, sx: I32x4, sy: I32x4) -> I64x4 {
    let dx = (sx - I32x4::splat(tri.v[i].x)).cast::<i64>();
    let dy = (sy - I32x4::splat(tri.v[i].y)).cast::<i64>();
    I64x4::splat(tri.b[i] as i64) * dx + I64x4::splat(tri.c[i] as i64) * dy
}

/// Sample one 2x2 quad: per-sample coverage from the non-accepted edges,
/// depth test, and fragment emission if anything survived.
#[allow(clippy::too_many_arguments)]
fn fine_quad(
    tile: &mut Tile,
    tri: &RasterTriangle,
    worker: u32,
    qx: i32,
    qy: i32,
    accept: u8,
    state: &RenderState,
    samples: &[(i32, i32)],
    stats: &mut FrameStats,
) {
    let px = I32x4::splat(qx) + QUAD_X;
    let py = I32x4::splat(qy) + QUAD_Y;
    // Lanes outside the framebuffer (edge tiles, odd sizes) never pass.
    let valid = px.simd_lt(I32x4::splat(tile.max.x)) & py.simd_lt(I32x4::splat(tile.max.y));
    if !valid.any() {
        return;
    }

    let px_fx = px * I32x4::splat(FX_ONE);
    let py_fx = py * I32x4::splat(FX_ONE);
    let inv_area = F32x4::splat(1.0 / tri.area2 as f32);
    let z0 = F32x4::splat(tri.z[0]);
    let z1 = F32x4::splat(tri.z[1]);
    let z2 = F32x4::splat(tri.z[2]);
    let sample_count = state.sample_count();

    let mut coverage = CoverageMask::default();
    for (s, &(ox, oy)) in samples[..sample_count].iter().enumerate() {
        let sx = px_fx + I32x4::splat(ox);
        let sy = py_fx + I32x4::splat(oy);

        let mut inside = valid;
        for i in 0..3 {
            if accept & (1 << i) != 0 {
                continue;
            }
            let e = edge_quad(tri, i, sx, sy) + I64x4::splat(tri.bias[i]);
            inside &= e.simd_ge(I64x4::splat(0)).cast();
        }
        if !inside.any() {
            continue;
        }

        if state.depth_test {
            let l0 = edge_quad(tri, 1, sx, sy).cast::<f32>() * inv_area;
            let l1 = edge_quad(tri, 2, sx, sy).cast::<f32>() * inv_area;
            let z = l0 * z0 + l1 * z1 + (F32x4::splat(1.0) - l0 - l1) * z2;

            let base = tile.quad_base(qx, qy, s, sample_count);
            let depth = F32x4::from_slice(&tile.depth[base..base + 4]);
            let pass = inside & z.simd_le(depth);
            if pass.any() {
                pass.select(z, depth)
                    .copy_to_slice(&mut tile.depth[base..base + 4]);
                coverage.set_quad(pass, s);
            }
        } else {
            coverage.set_quad(inside, s);
        }
    }

    if coverage.any() {
        let (ox, oy) = samples[0];
        let sx = px_fx + I32x4::splat(ox);
        let sy = py_fx + I32x4::splat(oy);
        let lambda0 = edge_quad(tri, 1, sx, sy).cast::<f32>() * inv_area;
        let lambda1 = edge_quad(tri, 2, sx, sy).cast::<f32>() * inv_area;
        let intra = tile.frags.len() as u32;
        tile.frags.push(QuadFragment {
            x: qx as u16,
            y: qy as u16,
            lambda0,
            lambda1,
            coverage,
            verts: tri.verts,
            worker,
            texture_id: tri.texture_id,
            tile: tile.id,
            intra,
        });
        stats.quad_fragments += 1;
    }
}
