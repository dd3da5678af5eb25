use std::f32::consts::FRAC_1_PI;
use std::simd::num::SimdFloat;

use glam::Vec3;
use rayon::prelude::*;

use crate::clip::{resolve, WorkerOutput};
use crate::fragment::QuadFragment;
use crate::simd_config::{clamp01, F32x4, Vec3x4, LANES};
use crate::state::RenderState;
use crate::texture::TextureSlot;
use crate::tile::TileGrid;
use crate::vertex::ProjectedVertex;

/// The closed set of pixel shaders. A tagged enum rather than trait objects:
/// the match disappears into the shading loop and the quad-wide bodies stay
/// inlinable.
#[derive(Clone, Copy, Debug)]
pub enum PixelShader {
    /// Constant color, no lighting.
    Solid(Vec3),
    Lambertian,
    /// Lambertian times a texture albedo, bilinear by default.
    LambertianAlbedo,
    BlinnPhong,
}

/// Shading stage: quad-parallel over the concatenation of every tile's
/// fragment buffer. Results are keyed by (tile, intra-tile index); the
/// returned vector is laid out tile-major in exactly that order.
pub fn shade_fragments(
    grid: &TileGrid,
    base: &[ProjectedVertex],
    workers: &[WorkerOutput],
    textures: &[TextureSlot],
    state: &RenderState,
    shader: &PixelShader,
) -> Vec<[[u8; 4]; 4]> {
    let total: usize = grid.tiles.iter().map(|t| t.frags.len()).sum();
    let mut results = vec![[[0u8; 4]; 4]; total];

    let mut chunks: Vec<&mut [[[u8; 4]; 4]]> = Vec::with_capacity(grid.tiles.len());
    let mut rest = results.as_mut_slice();
    for tile in &grid.tiles {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(tile.frags.len());
        chunks.push(head);
        rest = tail;
    }

    grid.tiles
        .par_iter()
        .zip(chunks.into_par_iter())
        .for_each(|(tile, out)| {
            tile.frags
                .par_iter()
                .zip(out.par_iter_mut())
                .for_each(|(frag, slot)| {
                    *slot = shade_quad(shader, frag, base, workers, textures, state);
                });
        });

    results
}

/// Shade one 2x2 quad: perspective-correct attribute interpolation, then the
/// selected shader, 4 pixels at a time.
pub(crate) fn shade_quad(
    shader: &PixelShader,
    frag: &QuadFragment,
    base: &[ProjectedVertex],
    workers: &[WorkerOutput],
    textures: &[TextureSlot],
    state: &RenderState,
) -> [[u8; 4]; 4] {
    let local = &workers[frag.worker as usize].verts;
    let v0 = resolve(base, local, frag.verts[0]);
    let v1 = resolve(base, local, frag.verts[1]);
    let v2 = resolve(base, local, frag.verts[2]);
    let attrs = frag.interpolate(v0, v1, v2);

    let light_dir = Vec3x4::splat(state.light_dir.normalize());
    let rgb = match shader {
        PixelShader::Solid(color) => Vec3x4::splat(*color),
        PixelShader::Lambertian => {
            let d = diffuse(&attrs.normal, &light_dir);
            Vec3x4 { x: d, y: d, z: d }
        }
        PixelShader::LambertianAlbedo => {
            let d = diffuse(&attrs.normal, &light_dir);
            let albedo = match textures.first() {
                Some(_) => {
                    // Out-of-range ids clamp to slot 0.
                    let id = (frag.texture_id as usize).min(textures.len() - 1);
                    textures[id].sample_quad(attrs.uv)
                }
                None => Vec3x4::splat(Vec3::ONE),
            };
            d * albedo
        }
        PixelShader::BlinnPhong => {
            let normal = attrs.normal.normalized();
            let d = diffuse(&attrs.normal, &light_dir);
            let eye_dir = (Vec3x4::splat(state.eye_pos()) - attrs.position).normalized();
            let half = (light_dir + eye_dir).normalized();
            let ndoth = normal.dot(half).simd_max(F32x4::splat(0.0));
            // No quad-wide pow; one scalar powf per lane.
            let spec = F32x4::from_array(ndoth.to_array().map(|v| v.powf(200.0)));
            let s = spec * F32x4::splat(2.0);
            Vec3x4 {
                x: d + s,
                y: d + s,
                z: d + s,
            }
        }
    };

    let quantize = |chan: F32x4| clamp01(chan) * F32x4::splat(255.0) + F32x4::splat(0.5);
    let (r, g, b) = (quantize(rgb.x), quantize(rgb.y), quantize(rgb.z));
    let mut out = [[0u8; 4]; 4];
    for lane in 0..LANES {
        out[lane] = [r[lane] as u8, g[lane] as u8, b[lane] as u8, 255];
    }
    out
}

/// The shared Lambert term: `(saturate(l . n) + 0.2) * 2 / pi`.
#[inline]
fn diffuse(normal: &Vec3x4, light_dir: &Vec3x4) -> F32x4 {
    let n = normal.normalized();
    let amount = light_dir.dot(n).simd_max(F32x4::splat(0.0));
    (amount + F32x4::splat(0.2)) * F32x4::splat(2.0 * FRAC_1_PI)
}
