use glam::{IVec2, Vec3};

use crate::math::{is_finite3, to_fixed, SUBPIXEL_BITS};
use crate::state::RenderState;

/// A screen-space triangle in fixed-point form, ready for binning and
/// rasterization.
///
/// Vertices are wound so that `area2 > 0` and the interior satisfies
/// `edge_at(i, p) + bias[i] >= 0` for all three edges. `B`/`C` are the edge
/// coefficients of `EdgeFunc_i(p) = B_i * (p.x - v_i.x) + C_i * (p.y - v_i.y)`
/// with edge `i` running from vertex `i` to vertex `i+1`.
#[derive(Clone, Copy, Debug)]
pub struct RasterTriangle {
    pub v: [IVec2; 3],
    pub b: [i32; 3],
    pub c: [i32; 3],
    /// Top-left fill rule tie-breaker, 0 for fill edges and -1 otherwise,
    /// added to the edge function before the `>= 0` coverage test.
    pub bias: [i64; 3],
    /// Per-edge corner-of-a-block codes, bit 0 = x offset, bit 1 = y offset.
    /// The reject corner maximizes the edge function over a block (so a
    /// negative value there rejects the whole block); the accept corner
    /// minimizes it (a non-negative value accepts the whole block).
    pub reject_corner: [u8; 3],
    pub accept_corner: [u8; 3],
    /// Twice the signed area in squared fixed-point units, always positive.
    pub area2: i64,
    /// Source vertex references: ids below the shared post-VS buffer length
    /// index that buffer, larger ids index the owning worker's buffer.
    pub verts: [u32; 3],
    /// Per-vertex NDC depth (`z * inv_w`), captured at setup.
    pub z: [f32; 3],
    pub texture_id: u32,
}

pub enum SetupError {
    /// Zero area, NaN coordinates, or otherwise unrasterizable.
    Degenerate,
    /// Facing away under the current culling state.
    Culled,
}

/// Fixed-point triangle setup. `screen` carries raster-space x/y in pixels
/// and NDC z per vertex, in submission order.
pub fn setup(
    state: &RenderState,
    screen: [Vec3; 3],
    verts: [u32; 3],
    texture_id: u32,
    width: u32,
    height: u32,
) -> Result<RasterTriangle, SetupError> {
    if !screen.iter().all(|&p| is_finite3(p)) {
        return Err(SetupError::Degenerate);
    }

    // Post-clip coordinates may land a hair outside the viewport from
    // floating-point error; clamp them back onto it.
    let max_x = (width as i32) << SUBPIXEL_BITS;
    let max_y = (height as i32) << SUBPIXEL_BITS;
    let fx = |p: &Vec3| {
        IVec2::new(
            to_fixed(p.x).clamp(0, max_x),
            to_fixed(p.y).clamp(0, max_y),
        )
    };
    let mut v = [fx(&screen[0]), fx(&screen[1]), fx(&screen[2])];
    let mut z = [screen[0].z, screen[1].z, screen[2].z];
    let mut verts = verts;

    // Positive for triangles that are counter-clockwise in model space once
    // the raster matrix has flipped y.
    let area2 = {
        let (d1, d2) = (v[1] - v[0], v[2] - v[0]);
        d2.x as i64 * d1.y as i64 - d1.x as i64 * d2.y as i64
    };

    if area2 == 0 {
        return Err(SetupError::Degenerate);
    }
    if state.back_face_culling {
        let front = if state.front_counter_clockwise {
            area2 > 0
        } else {
            area2 < 0
        };
        if !front {
            return Err(SetupError::Culled);
        }
    }

    // Normalize winding so the interior is on the non-negative side of every
    // edge.
    let area2 = if area2 < 0 {
        v.swap(1, 2);
        z.swap(1, 2);
        verts.swap(1, 2);
        -area2
    } else {
        area2
    };

    let mut b = [0i32; 3];
    let mut c = [0i32; 3];
    let mut bias = [0i64; 3];
    let mut reject_corner = [0u8; 3];
    let mut accept_corner = [0u8; 3];
    for i in 0..3 {
        let j = (i + 1) % 3;
        b[i] = v[j].y - v[i].y;
        c[i] = v[i].x - v[j].x;
        // Top-left rule: edges that are "fill" edges keep on-edge samples,
        // the others push them out by one fixed-point unit.
        let fill = b[i] > 0 || (b[i] == 0 && c[i] > 0);
        bias[i] = if fill { 0 } else { -1 };
        // Corner code bit set = far corner along that axis. The edge
        // function grows with x when B >= 0 and with y when C >= 0.
        let rj = (b[i] >= 0) as u8 | (((c[i] >= 0) as u8) << 1);
        reject_corner[i] = rj;
        accept_corner[i] = rj ^ 0b11;
    }

    Ok(RasterTriangle {
        v,
        b,
        c,
        bias,
        reject_corner,
        accept_corner,
        area2,
        verts,
        z,
        texture_id,
    })
}

impl RasterTriangle {
    /// Edge function `i` at a fixed-point position. 64-bit: at 4 sub-pixel
    /// bits a 4K-wide target already overflows `i32`.
    #[inline]
    pub fn edge_at(&self, i: usize, p: IVec2) -> i64 {
        self.b[i] as i64 * (p.x - self.v[i].x) as i64
            + self.c[i] as i64 * (p.y - self.v[i].y) as i64
    }

    /// Offset of a corner code within a block of `size_fx` fixed-point units.
    #[inline]
    pub fn corner_offset(code: u8, size_fx: i32) -> IVec2 {
        IVec2::new(
            (code & 1) as i32 * size_fx,
            ((code >> 1) & 1) as i32 * size_fx,
        )
    }

    /// Whole block lies outside edge `i`?
    #[inline]
    pub fn rejects_block(&self, i: usize, block_min: IVec2, size_fx: i32) -> bool {
        let corner = block_min + Self::corner_offset(self.reject_corner[i], size_fx);
        self.edge_at(i, corner) < 0
    }

    /// Whole block lies inside edge `i`?
    #[inline]
    pub fn accepts_block(&self, i: usize, block_min: IVec2, size_fx: i32) -> bool {
        let corner = block_min + Self::corner_offset(self.accept_corner[i], size_fx);
        self.edge_at(i, corner) >= 0
    }

    /// Fixed-point bounding box, min inclusive / max inclusive.
    #[inline]
    pub fn bbox(&self) -> (IVec2, IVec2) {
        (
            self.v[0].min(self.v[1]).min(self.v[2]),
            self.v[0].max(self.v[1]).max(self.v[2]),
        )
    }
}
