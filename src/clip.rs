use glam::{Vec2, Vec3, Vec4};
use rayon::prelude::*;

use crate::mesh::Mesh;
use crate::state::{FrameStats, RenderState};
use crate::triangle::{self, RasterTriangle, SetupError};
use crate::vertex::ProjectedVertex;

/// One worker's share of the clip stage: vertices it generated while
/// clipping, the raster triangles it emitted, and its counters. Triangle
/// order within a worker follows source submission order.
#[derive(Default)]
pub struct WorkerOutput {
    pub verts: Vec<ProjectedVertex>,
    pub tris: Vec<RasterTriangle>,
    pub stats: FrameStats,
}

/// Clip-space outcode, one bit per frustum plane.
const OUT_LEFT: u8 = 1 << 0; // x < -w
const OUT_RIGHT: u8 = 1 << 1; // x > w
const OUT_BOTTOM: u8 = 1 << 2; // y < -w
const OUT_TOP: u8 = 1 << 3; // y > w
const OUT_NEAR: u8 = 1 << 4; // z < 0
const OUT_FAR: u8 = 1 << 5; // z > w

#[inline]
fn clip_code(p: Vec4) -> u8 {
    let mut code = 0;
    if p.x < -p.w {
        code |= OUT_LEFT;
    }
    if p.x > p.w {
        code |= OUT_RIGHT;
    }
    if p.y < -p.w {
        code |= OUT_BOTTOM;
    }
    if p.y > p.w {
        code |= OUT_TOP;
    }
    if p.z < 0.0 {
        code |= OUT_NEAR;
    }
    if p.z > p.w {
        code |= OUT_FAR;
    }
    code
}

/// Signed distance to plane `i`, positive inside.
#[inline]
fn plane_dist(i: usize, p: Vec4) -> f32 {
    match i {
        0 => p.x + p.w,
        1 => p.w - p.x,
        2 => p.y + p.w,
        3 => p.w - p.y,
        4 => p.z,
        _ => p.w - p.z,
    }
}

/// Clip-space vertex plus its attributes, interpolated linearly while
/// clipping.
#[derive(Clone, Copy, Default)]
struct ClipVert {
    pos: Vec4,
    position: Vec3,
    normal: Vec3,
    uv: Vec2,
}

impl ClipVert {
    fn of(v: &ProjectedVertex) -> Self {
        ClipVert {
            pos: v.pos,
            position: v.position,
            normal: v.normal,
            uv: v.uv,
        }
    }

    fn lerp(a: &ClipVert, b: &ClipVert, t: f32) -> Self {
        ClipVert {
            pos: a.pos.lerp(b.pos, t),
            position: a.position.lerp(b.position, t),
            normal: a.normal.lerp(b.normal, t),
            uv: a.uv.lerp(b.uv, t),
        }
    }
}

/// Sutherland-Hodgman polygon buffer: 3 starting vertices, each of the 6
/// planes can add at most one.
const MAX_POLY: usize = 12;

/// Clip stage: triangles are partitioned across `workers` contiguous ranges;
/// each range is clipped independently and emits into its own buffers.
pub fn clip_triangles<M: Mesh + Sync>(
    state: &RenderState,
    base: &[ProjectedVertex],
    mesh: &M,
    width: u32,
    height: u32,
    workers: usize,
) -> Vec<WorkerOutput> {
    let triangle_count = mesh.triangle_count();
    let per_worker = triangle_count.div_ceil(workers.max(1));

    (0..workers)
        .into_par_iter()
        .map(|k| {
            let range = (k * per_worker).min(triangle_count)..((k + 1) * per_worker).min(triangle_count);
            let mut out = WorkerOutput::default();
            for t in range {
                clip_one(state, base, mesh, t, width, height, &mut out);
            }
            out
        })
        .collect()
}

fn clip_one<M: Mesh>(
    state: &RenderState,
    base: &[ProjectedVertex],
    mesh: &M,
    tri: usize,
    width: u32,
    height: u32,
    out: &mut WorkerOutput,
) {
    out.stats.triangles_in += 1;
    let [i0, i1, i2] = mesh.index(tri);
    let texture_id = mesh.texture_id(tri);
    let (p0, p1, p2) = (
        base[i0 as usize].pos,
        base[i1 as usize].pos,
        base[i2 as usize].pos,
    );
    let codes = [clip_code(p0), clip_code(p1), clip_code(p2)];

    // All three vertices outside one plane.
    if codes[0] & codes[1] & codes[2] != 0 {
        out.stats.trivially_rejected += 1;
        return;
    }

    let or_code = codes[0] | codes[1] | codes[2];
    if or_code == 0 {
        // Fully inside: reference the source vertices directly.
        emit(state, base, out, [i0, i1, i2], texture_id, width, height);
        return;
    }

    out.stats.clipped += 1;

    let mut poly = [ClipVert::default(); MAX_POLY];
    let mut scratch = [ClipVert::default(); MAX_POLY];
    poly[0] = ClipVert::of(&base[i0 as usize]);
    poly[1] = ClipVert::of(&base[i1 as usize]);
    poly[2] = ClipVert::of(&base[i2 as usize]);
    let mut len = 3;

    for plane in 0..6 {
        if or_code & (1 << plane) == 0 {
            continue;
        }
        let mut new_len = 0;
        for i in 0..len {
            let curr = poly[i];
            let prev = poly[(i + len - 1) % len];
            let dc = plane_dist(plane, curr.pos);
            let dp = plane_dist(plane, prev.pos);
            if dc >= 0.0 {
                if dp < 0.0 {
                    scratch[new_len] = ClipVert::lerp(&prev, &curr, dp / (dp - dc));
                    new_len += 1;
                }
                scratch[new_len] = curr;
                new_len += 1;
            } else if dp >= 0.0 {
                scratch[new_len] = ClipVert::lerp(&prev, &curr, dp / (dp - dc));
                new_len += 1;
            }
        }
        poly[..new_len].copy_from_slice(&scratch[..new_len]);
        len = new_len;
        if len == 0 {
            out.stats.trivially_rejected += 1;
            return;
        }
    }
    if len < 3 {
        out.stats.degenerate_dropped += 1;
        return;
    }

    // Append the clipped polygon to this worker's vertex buffer and emit a
    // triangle fan from its first vertex.
    let first = (base.len() + out.verts.len()) as u32;
    for cv in &poly[..len] {
        out.verts
            .push(ProjectedVertex::from_clip(cv.pos, cv.position, cv.normal, cv.uv));
    }
    for i in 1..len - 1 {
        emit(
            state,
            base,
            out,
            [first, first + i as u32, first + i as u32 + 1],
            texture_id,
            width,
            height,
        );
    }
}

/// Perspective divide, raster transform and fixed-point setup for one
/// emitted triangle.
fn emit(
    state: &RenderState,
    base: &[ProjectedVertex],
    out: &mut WorkerOutput,
    verts: [u32; 3],
    texture_id: u32,
    width: u32,
    height: u32,
) {
    let screen = verts.map(|id| {
        let pos = resolve(base, &out.verts, id).pos;
        let inv_w = if pos.w != 0.0 { 1.0 / pos.w } else { 0.0 };
        let ndc = pos.truncate() * inv_w;
        state.raster.transform_point3(ndc)
    });

    match triangle::setup(state, screen, verts, texture_id, width, height) {
        Ok(tri) => {
            out.stats.raster_triangles += 1;
            out.tris.push(tri);
        }
        Err(SetupError::Culled) => out.stats.backfaces_culled += 1,
        Err(SetupError::Degenerate) => out.stats.degenerate_dropped += 1,
    }
}

/// Vertex reference lookup: ids below the shared buffer length are source
/// vertices, the rest index the worker's own buffer.
#[inline]
pub fn resolve<'a>(
    base: &'a [ProjectedVertex],
    local: &'a [ProjectedVertex],
    id: u32,
) -> &'a ProjectedVertex {
    let id = id as usize;
    if id < base.len() {
        &base[id]
    } else {
        &local[id - base.len()]
    }
}
