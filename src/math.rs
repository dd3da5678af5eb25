use glam::{Mat4, Vec3};

/// Sub-pixel precision of the fixed-point raster coordinates: 4 bits, so one
/// pixel spans 16 fixed-point units and all DirectX standard sample positions
/// (which are multiples of 1/16) are exactly representable.
pub const SUBPIXEL_BITS: u32 = 4;
pub const FX_ONE: i32 = 1 << SUBPIXEL_BITS;

/// Float pixel coordinate to fixed point. Ties round to even so that vertices
/// landing exactly between two sub-pixel positions don't drift in one
/// direction across a mesh.
#[inline]
pub fn to_fixed(v: f32) -> i32 {
    (v * FX_ONE as f32).round_ties_even() as i32
}

#[inline]
pub fn fixed_to_f32(v: i32) -> f32 {
    v as f32 / FX_ONE as f32
}

/// NDC → screen matrix for a framebuffer of the given size: x from [-1, 1] to
/// [0, width], y flipped from [1, -1] to [0, height], z passed through.
pub fn raster_matrix(width: u32, height: u32) -> Mat4 {
    let (w, h) = (width as f32, height as f32);
    Mat4::from_translation(Vec3::new(w * 0.5, h * 0.5, 0.0))
        * Mat4::from_scale(Vec3::new(w * 0.5, -h * 0.5, 1.0))
}

#[inline]
pub fn saturate(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// True iff every component of a screen-space vertex is finite. Triangle
/// setup drops anything carrying NaN or infinity.
#[inline]
pub fn is_finite3(v: Vec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}
