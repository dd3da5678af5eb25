use crate::simd_config::{F32x4, QuadMask, Vec2x4, Vec3x4};
use crate::vertex::ProjectedVertex;

/// Per-fragment coverage bitfield: bit `sample * 4 + pixel` with pixels in
/// TL, TR, BL, BR order. 128 bits cover the 32-sample ceiling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoverageMask {
    bits: u128,
}

impl CoverageMask {
    #[inline]
    pub fn set(&mut self, i: u32) {
        self.bits |= 1u128 << i;
    }

    #[inline]
    pub fn get(&self, i: u32) -> bool {
        self.bits >> i & 1 != 0
    }

    /// Set the four pixel bits of one sample from a quad mask.
    #[inline]
    pub fn set_quad(&mut self, mask: QuadMask, sample: usize) {
        self.bits |= (mask.to_bitmask() as u128) << (sample * 4);
    }

    /// Quad mask of one sample's pixel bits.
    #[inline]
    pub fn quad(&self, sample: usize) -> QuadMask {
        QuadMask::from_bitmask((self.bits >> (sample * 4)) as u64 & 0b1111)
    }

    #[inline]
    pub fn any(&self) -> bool {
        self.bits != 0
    }

    pub fn count(&self) -> u32 {
        self.bits.count_ones()
    }
}

/// One shaded unit: a 2x2 pixel block with nonzero post-depth coverage.
/// `lambda0`/`lambda1` are the screen-space barycentrics at sample 0 of each
/// pixel; the perspective correction happens at interpolation time.
#[derive(Clone, Copy, Debug)]
pub struct QuadFragment {
    /// Top-left pixel of the quad, even-aligned.
    pub x: u16,
    pub y: u16,
    pub lambda0: F32x4,
    pub lambda1: F32x4,
    pub coverage: CoverageMask,
    pub verts: [u32; 3],
    pub worker: u32,
    pub texture_id: u32,
    pub tile: u32,
    /// Dense index within the owning tile's fragment buffer; keys the
    /// shading-result slot.
    pub intra: u32,
}

/// Model-space attributes interpolated across the quad.
pub struct QuadAttributes {
    pub position: Vec3x4,
    pub normal: Vec3x4,
    pub uv: Vec2x4,
}

impl QuadFragment {
    /// Perspective-correct interpolation: scale each barycentric by its
    /// vertex's `1/w`, renormalize, and blend the model-space attributes.
    pub fn interpolate(
        &self,
        v0: &ProjectedVertex,
        v1: &ProjectedVertex,
        v2: &ProjectedVertex,
    ) -> QuadAttributes {
        let one = F32x4::splat(1.0);
        let mut b0 = self.lambda0;
        let mut b1 = self.lambda1;
        let mut b2 = one - b0 - b1;
        b0 *= F32x4::splat(v0.inv_w);
        b1 *= F32x4::splat(v1.inv_w);
        b2 *= F32x4::splat(v2.inv_w);
        let inv = one / (b0 + b1 + b2);
        b0 *= inv;
        b1 *= inv;
        b2 = one - b0 - b1;

        QuadAttributes {
            position: b0 * Vec3x4::splat(v0.position)
                + b1 * Vec3x4::splat(v1.position)
                + b2 * Vec3x4::splat(v2.position),
            normal: b0 * Vec3x4::splat(v0.normal)
                + b1 * Vec3x4::splat(v1.normal)
                + b2 * Vec3x4::splat(v2.normal),
            uv: b0 * Vec2x4::splat(v0.uv) + b1 * Vec2x4::splat(v1.uv) + b2 * Vec2x4::splat(v2.uv),
        }
    }
}
