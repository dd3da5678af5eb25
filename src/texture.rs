use glam::Vec2;

use crate::simd_config::{F32x4, Vec2x4, Vec3x4, LANES};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    #[default]
    Bilinear,
}

/// A bound texture: RGBA8 texels, wrap-repeat addressing, nearest or
/// bilinear filtering.
#[derive(Clone)]
pub struct TextureSlot {
    width: u32,
    height: u32,
    texels: Vec<[u8; 4]>,
    filter: Filter,
}

impl TextureSlot {
    /// INVARIANT: `texels.len() == width * height` and both dimensions are
    /// nonzero.
    pub fn new(width: u32, height: u32, texels: Vec<[u8; 4]>, filter: Filter) -> Self {
        assert!(width > 0 && height > 0, "texture dimensions must be nonzero");
        assert_eq!(texels.len(), (width * height) as usize);
        TextureSlot {
            width,
            height,
            texels,
            filter,
        }
    }

    /// 1x1 texture of a single color.
    pub fn solid(color: [u8; 4]) -> Self {
        TextureSlot::new(1, 1, vec![color], Filter::Nearest)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn fetch(&self, x: i32, y: i32) -> [u8; 4] {
        let x = x.rem_euclid(self.width as i32) as usize;
        let y = y.rem_euclid(self.height as i32) as usize;
        self.texels[y * self.width as usize + x]
    }

    pub fn sample(&self, uv: Vec2) -> [u8; 4] {
        match self.filter {
            Filter::Nearest => {
                let x = (uv.x * self.width as f32).floor() as i32;
                let y = (uv.y * self.height as f32).floor() as i32;
                self.fetch(x, y)
            }
            Filter::Bilinear => {
                let [r, g, b, a] = self.sample_bilinear(uv.x, uv.y);
                [
                    (r * 255.0 + 0.5) as u8,
                    (g * 255.0 + 0.5) as u8,
                    (b * 255.0 + 0.5) as u8,
                    (a * 255.0 + 0.5) as u8,
                ]
            }
        }
    }

    fn sample_bilinear(&self, u: f32, v: f32) -> [f32; 4] {
        let x = u * self.width as f32 - 0.5;
        let y = v * self.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (x0, y0) = (x0 as i32, y0 as i32);

        let mut out = [0.0f32; 4];
        let t00 = self.fetch(x0, y0);
        let t10 = self.fetch(x0 + 1, y0);
        let t01 = self.fetch(x0, y0 + 1);
        let t11 = self.fetch(x0 + 1, y0 + 1);
        for c in 0..4 {
            let top = t00[c] as f32 * (1.0 - fx) + t10[c] as f32 * fx;
            let bottom = t01[c] as f32 * (1.0 - fx) + t11[c] as f32 * fx;
            out[c] = (top * (1.0 - fy) + bottom * fy) / 255.0;
        }
        out
    }

    /// Quad-wide RGB fetch for the shading pass, one uv per lane. Returned
    /// channels are in [0, 1].
    pub fn sample_quad(&self, uv: Vec2x4) -> Vec3x4 {
        let (mut r, mut g, mut b) = ([0.0; LANES], [0.0; LANES], [0.0; LANES]);
        for lane in 0..LANES {
            let texel = match self.filter {
                Filter::Nearest => {
                    let t = self.sample(Vec2::new(uv.x[lane], uv.y[lane]));
                    [
                        t[0] as f32 / 255.0,
                        t[1] as f32 / 255.0,
                        t[2] as f32 / 255.0,
                        t[3] as f32 / 255.0,
                    ]
                }
                Filter::Bilinear => self.sample_bilinear(uv.x[lane], uv.y[lane]),
            };
            (r[lane], g[lane], b[lane]) = (texel[0], texel[1], texel[2]);
        }
        Vec3x4 {
            x: F32x4::from_array(r),
            y: F32x4::from_array(g),
            z: F32x4::from_array(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> TextureSlot {
        // 2x2: white, black / black, white
        TextureSlot::new(
            2,
            2,
            vec![
                [255, 255, 255, 255],
                [0, 0, 0, 255],
                [0, 0, 0, 255],
                [255, 255, 255, 255],
            ],
            Filter::Nearest,
        )
    }

    #[test]
    fn nearest_picks_texel_centers() {
        let tex = checker();
        assert_eq!(tex.sample(Vec2::new(0.25, 0.25)), [255, 255, 255, 255]);
        assert_eq!(tex.sample(Vec2::new(0.75, 0.25)), [0, 0, 0, 255]);
    }

    #[test]
    fn wrap_repeats_outside_unit_square() {
        let tex = checker();
        assert_eq!(
            tex.sample(Vec2::new(1.25, -0.75)),
            tex.sample(Vec2::new(0.25, 0.25))
        );
    }

    #[test]
    fn bilinear_midpoint_averages_neighbours() {
        let mut tex = checker();
        tex.filter = Filter::Bilinear;
        // Dead center of the texture blends all four texels equally.
        let [r, g, b, _] = tex.sample_bilinear(0.5, 0.5);
        assert!((r - 0.5).abs() < 1e-3);
        assert!((g - 0.5).abs() < 1e-3);
        assert!((b - 0.5).abs() < 1e-3);
    }

    #[test]
    fn quad_fetch_matches_scalar_path() {
        let tex = checker();
        let uv = Vec2x4 {
            x: F32x4::from_array([0.25, 0.75, 0.25, 0.75]),
            y: F32x4::from_array([0.25, 0.25, 0.75, 0.75]),
        };
        let rgb = tex.sample_quad(uv);
        assert_eq!(rgb.x.to_array(), [1.0, 0.0, 0.0, 1.0]);
    }
}
