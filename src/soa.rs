//! 4-wide structure-of-arrays batch kernel.
//!
//! The same component of four instances sits in one `f32x4` lane group, so
//! each vector instruction advances all four tests at once. The scalar
//! kernel in [`crate::raytest`] is the portable reference: the batched
//! variants make the same hit/miss decisions and agree on the hit
//! parameters within epsilon, though not necessarily bit for bit.

use std::ops::{Add, Index, Mul, Sub};

use glam::Vec3A;
use wide::{f32x4, CmpGe, CmpGt, CmpLe, CmpLt};

use crate::{raytest::DOT_EPSILON, Axis, Ray};

/// Four 3D vectors in structure-of-arrays layout
#[derive(Debug, Clone, Copy)]
pub struct Vec3x4 {
    pub x: f32x4,
    pub y: f32x4,
    pub z: f32x4,
}

impl Vec3x4 {
    pub const ZERO: Self = Self {
        x: f32x4::ZERO,
        y: f32x4::ZERO,
        z: f32x4::ZERO,
    };

    /// Broadcast one vector into all four lanes
    #[inline]
    pub fn splat(v: Vec3A) -> Self {
        Self {
            x: f32x4::splat(v.x),
            y: f32x4::splat(v.y),
            z: f32x4::splat(v.z),
        }
    }

    /// Transpose four vectors into lane-per-instance layout
    #[inline]
    pub fn from_vecs(v: [Vec3A; 4]) -> Self {
        Self {
            x: f32x4::from([v[0].x, v[1].x, v[2].x, v[3].x]),
            y: f32x4::from([v[0].y, v[1].y, v[2].y, v[3].y]),
            z: f32x4::from([v[0].z, v[1].z, v[2].z, v[3].z]),
        }
    }

    /// Inner product of 4 SOA layout vectors
    #[inline]
    pub fn dot(self, rhs: Self) -> f32x4 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Outer product of 4 SOA layout vectors
    #[inline]
    pub fn cross(self, rhs: Self) -> Self {
        Self {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }
}

impl Add for Vec3x4 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl Sub for Vec3x4 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl Mul<f32x4> for Vec3x4 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f32x4) -> Self {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

impl Index<Axis> for Vec3x4 {
    type Output = f32x4;

    fn index(&self, axis: Axis) -> &Self::Output {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}

/// Hit results of one ray against four triangles. Bit i of `mask` is set
/// when lane i hit; `t`, `v` and `w` are only meaningful for set lanes.
#[derive(Debug, Clone, Copy)]
pub struct TriangleHit4 {
    pub mask: u32,
    pub t: f32x4,
    pub v: f32x4,
    pub w: f32x4,
}

/// Collapse a lane mask into its low 4 bits
#[inline]
fn mask_bits(mask: f32x4) -> u32 {
    (mask.to_bitmask() as u32) & 0xF
}

#[inline]
fn test_ray_triangle_x4(
    ray: &Ray,
    v0: Vec3x4,
    v1: Vec3x4,
    v2: Vec3x4,
    det_mask: impl Fn(f32x4) -> f32x4,
) -> TriangleHit4 {
    let origin = Vec3x4::splat(ray.origin);
    let direction = Vec3x4::splat(ray.direction);

    let d0 = v1 - v0;
    let d1 = v2 - v0;
    let c = direction.cross(d1);
    let det = d0.dot(c);
    let facing = det_mask(det);

    // rejected lanes may divide by zero here; the resulting NaNs compare
    // false below and never make it past the facing mask
    let inv_det = f32x4::ONE / det;
    let s = origin - v0;
    let v = s.dot(c) * inv_det;
    let q = s.cross(d0);
    let w = direction.dot(q) * inv_det;
    let t = d1.dot(q) * inv_det;

    let zero = f32x4::ZERO;
    let one = f32x4::ONE;
    let inside = v.simd_ge(zero) & v.simd_le(one) & w.simd_ge(zero) & (v + w).simd_le(one);
    let in_range = t.simd_ge(zero) & t.simd_le(f32x4::splat(ray.t));

    TriangleHit4 {
        mask: mask_bits(facing & inside & in_range),
        t,
        v,
        w,
    }
}

/// Test one ray against the front faces of four triangles
#[inline]
pub fn test_ray_triangle_front_x4(ray: &Ray, v0: Vec3x4, v1: Vec3x4, v2: Vec3x4) -> TriangleHit4 {
    test_ray_triangle_x4(ray, v0, v1, v2, |det| {
        det.simd_lt(f32x4::splat(-DOT_EPSILON))
    })
}

/// Test one ray against the back faces of four triangles
#[inline]
pub fn test_ray_triangle_back_x4(ray: &Ray, v0: Vec3x4, v1: Vec3x4, v2: Vec3x4) -> TriangleHit4 {
    test_ray_triangle_x4(ray, v0, v1, v2, |det| det.simd_gt(f32x4::splat(DOT_EPSILON)))
}

/// Test one ray against both faces of four triangles
#[inline]
pub fn test_ray_triangle_both_x4(ray: &Ray, v0: Vec3x4, v1: Vec3x4, v2: Vec3x4) -> TriangleHit4 {
    test_ray_triangle_x4(ray, v0, v1, v2, |det| {
        det.abs().simd_gt(f32x4::splat(DOT_EPSILON))
    })
}

/// Slab test of one ray against four boxes at once, returning a 4-bit hit
/// mask. `sign` carries the per-axis sign of the inverse direction
/// ([`Ray::direction_signs`]); entry and exit bounds are chosen from it the
/// same way the scalar test does, and the `[tmin, tmax]` window narrows
/// across the three axes with equality kept alive.
pub fn test_ray_aabb_x4(
    mut tmin: f32x4,
    mut tmax: f32x4,
    origin: &Vec3x4,
    inv_direction: &Vec3x4,
    sign: [bool; 3],
    bmin: &Vec3x4,
    bmax: &Vec3x4,
) -> u32 {
    for axis in [Axis::X, Axis::Y, Axis::Z] {
        let (near, far) = if sign[axis.index()] {
            (bmax[axis], bmin[axis])
        } else {
            (bmin[axis], bmax[axis])
        };
        tmin = tmin.max((near - origin[axis]) * inv_direction[axis]);
        tmax = tmax.min((far - origin[axis]) * inv_direction[axis]);
    }
    mask_bits(tmin.simd_le(tmax))
}
