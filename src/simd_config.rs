//! Lane configuration for quad-parallel work: the fragment stages run 4-wide,
//! one lane per pixel of a 2x2 quad in TL, TR, BL, BR order.

use std::ops::{Add, Div, Mul, Sub};
use std::simd::num::SimdFloat;
use std::simd::{Mask, Simd, StdFloat};

use glam::{Vec2, Vec3};

pub const LANES: usize = 4;

/// Pixel offset of each lane within the quad.
pub(crate) const QUAD_X: Simd<i32, LANES> = Simd::from_array([0, 1, 0, 1]);
pub(crate) const QUAD_Y: Simd<i32, LANES> = Simd::from_array([0, 0, 1, 1]);

pub type F32x4 = Simd<f32, LANES>;
pub type I32x4 = Simd<i32, LANES>;
pub type I64x4 = Simd<i64, LANES>;
pub type QuadMask = Mask<i32, LANES>;

#[inline]
pub fn clamp01(v: F32x4) -> F32x4 {
    v.simd_max(F32x4::splat(0.0)).simd_min(F32x4::splat(1.0))
}

/// Structure-of-arrays 2-vector, one scalar per quad lane.
#[derive(Clone, Copy, Debug)]
pub struct Vec2x4 {
    pub x: F32x4,
    pub y: F32x4,
}

/// Structure-of-arrays 3-vector, one scalar per quad lane.
#[derive(Clone, Copy, Debug)]
pub struct Vec3x4 {
    pub x: F32x4,
    pub y: F32x4,
    pub z: F32x4,
}

impl Vec2x4 {
    #[inline]
    pub fn splat(v: Vec2) -> Self {
        Vec2x4 {
            x: F32x4::splat(v.x),
            y: F32x4::splat(v.y),
        }
    }
}

impl Vec3x4 {
    pub const ZERO: Vec3x4 = Vec3x4 {
        x: F32x4::from_array([0.0; LANES]),
        y: F32x4::from_array([0.0; LANES]),
        z: F32x4::from_array([0.0; LANES]),
    };

    #[inline]
    pub fn splat(v: Vec3) -> Self {
        Vec3x4 {
            x: F32x4::splat(v.x),
            y: F32x4::splat(v.y),
            z: F32x4::splat(v.z),
        }
    }

    #[inline]
    pub fn dot(self, other: Vec3x4) -> F32x4 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn normalized(self) -> Vec3x4 {
        let len = self.dot(self).sqrt();
        Vec3x4 {
            x: self.x / len,
            y: self.y / len,
            z: self.z / len,
        }
    }

    #[inline]
    pub fn lane(self, i: usize) -> Vec3 {
        Vec3::new(self.x[i], self.y[i], self.z[i])
    }
}

impl Add for Vec2x4 {
    type Output = Vec2x4;

    #[inline]
    fn add(self, rhs: Vec2x4) -> Vec2x4 {
        Vec2x4 {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Add for Vec3x4 {
    type Output = Vec3x4;

    #[inline]
    fn add(self, rhs: Vec3x4) -> Vec3x4 {
        Vec3x4 {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl Sub for Vec3x4 {
    type Output = Vec3x4;

    #[inline]
    fn sub(self, rhs: Vec3x4) -> Vec3x4 {
        Vec3x4 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl Mul<Vec2x4> for F32x4 {
    type Output = Vec2x4;

    #[inline]
    fn mul(self, rhs: Vec2x4) -> Vec2x4 {
        Vec2x4 {
            x: self * rhs.x,
            y: self * rhs.y,
        }
    }
}

impl Mul<Vec3x4> for F32x4 {
    type Output = Vec3x4;

    #[inline]
    fn mul(self, rhs: Vec3x4) -> Vec3x4 {
        Vec3x4 {
            x: self * rhs.x,
            y: self * rhs.y,
            z: self * rhs.z,
        }
    }
}

impl Mul<F32x4> for Vec3x4 {
    type Output = Vec3x4;

    #[inline]
    fn mul(self, rhs: F32x4) -> Vec3x4 {
        rhs * self
    }
}

impl Div<F32x4> for Vec3x4 {
    type Output = Vec3x4;

    #[inline]
    fn div(self, rhs: F32x4) -> Vec3x4 {
        Vec3x4 {
            x: self.x / rhs,
            y: self.y / rhs,
            z: self.z / rhs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_lane_order_is_tl_tr_bl_br() {
        assert_eq!(QUAD_X.to_array(), [0, 1, 0, 1]);
        assert_eq!(QUAD_Y.to_array(), [0, 0, 1, 1]);
    }

    #[test]
    fn normalized_has_unit_length() {
        let v = Vec3x4::splat(Vec3::new(3.0, 0.0, 4.0)).normalized();
        let len = v.dot(v);
        for i in 0..LANES {
            assert!((len[i] - 1.0).abs() < 1e-6);
        }
    }
}
