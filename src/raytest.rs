//! Scalar ray intersection kernel.
//!
//! Every test either returns the hit parameters or a sentinel miss; the
//! degenerate configurations (near-parallel planes, sliver triangles,
//! grazing spheres) are rejected by epsilon checks up front so no NaN or
//! infinity ever reaches a caller.

use glam::Vec3A;

use crate::{Axis, Plane, Ray, Sphere};

/// Epsilon for determinant/denominator rejection of near-parallel setups
pub const DOT_EPSILON: f32 = 1.0e-6;

/// Epsilon used when comparing hit parameters
pub const HIT_EPSILON: f32 = 1.0e-5;

/// Outcome of an intersection query. `Front` and `Back` are successful
/// hits that additionally report the struck face; `Success` is a hit whose
/// facing was not resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestResult {
    #[default]
    Fail,
    Success,
    Front,
    Back,
}

impl TestResult {
    #[inline]
    pub fn is_hit(self) -> bool {
        !matches!(self, TestResult::Fail)
    }
}

/// Intersect a ray with a plane. Fails when the ray runs parallel to the
/// plane within epsilon rather than dividing by a vanishing denominator.
pub fn test_ray_plane(ray: &Ray, plane: &Plane) -> Option<f32> {
    let denom = ray.direction.dot(plane.normal);
    if denom.abs() < DOT_EPSILON {
        return None;
    }
    let t = -(ray.origin.dot(plane.normal) + plane.d) / denom;
    if t < 0.0 || ray.t < t {
        return None;
    }
    Some(t)
}

/// Intersect a ray with a solid sphere: an origin inside the volume
/// reports `t = 0`, the semantics wanted by occlusion queries that start
/// inside a medium.
pub fn test_ray_sphere_solid(ray: &Ray, sphere: &Sphere) -> Option<f32> {
    let m = ray.origin - sphere.center;
    let b = m.dot(ray.direction);
    let c = m.length_squared() - sphere.radius * sphere.radius;
    if 0.0 < c && 0.0 < b {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant <= f32::EPSILON {
        return None;
    }
    let t = (-b - discriminant.sqrt()).max(0.0);
    if ray.t < t {
        return None;
    }
    Some(t)
}

/// Intersect a ray with a sphere's surface: always the front-most surface
/// crossing, even when the origin is inside.
pub fn test_ray_sphere_surface(ray: &Ray, sphere: &Sphere) -> Option<f32> {
    let m = ray.origin - sphere.center;
    let b = m.dot(ray.direction);
    let c = m.length_squared() - sphere.radius * sphere.radius;
    if 0.0 < c && 0.0 < b {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant <= f32::EPSILON {
        return None;
    }
    let sq = discriminant.sqrt();
    let mut t = -b - sq;
    if t < 0.0 {
        t = -b + sq;
    }
    if t < 0.0 || ray.t < t {
        return None;
    }
    Some(t)
}

/// Intersect a ray with the front face of triangle (v0, v1, v2).
///
/// On a hit returns `(t, v, w)`; the barycentric weights of (v0, v1, v2)
/// are `(1 - v - w, v, w)`. The boundary comparisons accept an exact zero,
/// so of two triangles sharing an edge a crossing ray is attributed to one
/// of them, never both and never neither.
pub fn test_ray_triangle_front(
    ray: &Ray,
    v0: Vec3A,
    v1: Vec3A,
    v2: Vec3A,
) -> Option<(f32, f32, f32)> {
    let d0 = v1 - v0;
    let d1 = v2 - v0;
    let c = ray.direction.cross(d1);
    let det = d0.dot(c);
    if -DOT_EPSILON <= det {
        // parallel or facing away
        return None;
    }
    let inv_det = 1.0 / det;
    let s = ray.origin - v0;
    let v = s.dot(c) * inv_det;
    if v < 0.0 || 1.0 < v {
        return None;
    }
    let q = s.cross(d0);
    let w = ray.direction.dot(q) * inv_det;
    if w < 0.0 || 1.0 < v + w {
        return None;
    }
    let t = d1.dot(q) * inv_det;
    if t < 0.0 || ray.t < t {
        return None;
    }
    Some((t, v, w))
}

/// Intersect a ray with the back face of triangle (v0, v1, v2).
pub fn test_ray_triangle_back(
    ray: &Ray,
    v0: Vec3A,
    v1: Vec3A,
    v2: Vec3A,
) -> Option<(f32, f32, f32)> {
    let d0 = v1 - v0;
    let d1 = v2 - v0;
    let c = ray.direction.cross(d1);
    let det = d0.dot(c);
    if det <= DOT_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = ray.origin - v0;
    let v = s.dot(c) * inv_det;
    if v < 0.0 || 1.0 < v {
        return None;
    }
    let q = s.cross(d0);
    let w = ray.direction.dot(q) * inv_det;
    if w < 0.0 || 1.0 < v + w {
        return None;
    }
    let t = d1.dot(q) * inv_det;
    if t < 0.0 || ray.t < t {
        return None;
    }
    Some((t, v, w))
}

/// Intersect a ray with both faces of triangle (v0, v1, v2), reporting
/// which face was struck.
pub fn test_ray_triangle_both(
    ray: &Ray,
    v0: Vec3A,
    v1: Vec3A,
    v2: Vec3A,
) -> Option<(TestResult, f32, f32, f32)> {
    let d0 = v1 - v0;
    let d1 = v2 - v0;
    let c = ray.direction.cross(d1);
    let det = d0.dot(c);
    if det.abs() <= DOT_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = ray.origin - v0;
    let v = s.dot(c) * inv_det;
    if v < 0.0 || 1.0 < v {
        return None;
    }
    let q = s.cross(d0);
    let w = ray.direction.dot(q) * inv_det;
    if w < 0.0 || 1.0 < v + w {
        return None;
    }
    let t = d1.dot(q) * inv_det;
    if t < 0.0 || ray.t < t {
        return None;
    }
    let result = if det < 0.0 {
        TestResult::Front
    } else {
        TestResult::Back
    };
    Some((result, t, v, w))
}

/// Intersect a ray with the planar quad (p0, p1, p2, p3), given in winding
/// order, by splitting it along the p0-p2 diagonal.
pub fn test_ray_rectangle(
    ray: &Ray,
    p0: Vec3A,
    p1: Vec3A,
    p2: Vec3A,
    p3: Vec3A,
) -> Option<f32> {
    if let Some((_, t, _, _)) = test_ray_triangle_both(ray, p0, p1, p2) {
        return Some(t);
    }
    test_ray_triangle_both(ray, p0, p2, p3).map(|(_, t, _, _)| t)
}

/// Slab test of a ray against the box `[bmin, bmax]`, narrowing the
/// incoming `[tmin, tmax]` window axis by axis. Which bound acts as entry
/// and which as exit follows from the sign of the inverse direction, so
/// the loop never branches on the direction itself. Equality keeps the
/// window alive: a zero-extent box still reports rays that pass exactly
/// through its point.
pub fn test_ray_aabb(
    mut tmin: f32,
    mut tmax: f32,
    ray: &Ray,
    bmin: Vec3A,
    bmax: Vec3A,
) -> Option<(f32, f32)> {
    for i in 0..3 {
        let inv = ray.inv_direction[i];
        let (near, far) = if inv < 0.0 {
            (bmax[i], bmin[i])
        } else {
            (bmin[i], bmax[i])
        };
        tmin = tmin.max((near - ray.origin[i]) * inv);
        tmax = tmax.min((far - ray.origin[i]) * inv);
        if tmax < tmin {
            return None;
        }
    }
    Some((tmin, tmax))
}

/// Single-axis slab test, the per-axis building block of the box test.
pub fn test_ray_slab(
    mut tmin: f32,
    mut tmax: f32,
    ray: &Ray,
    slab_min: f32,
    slab_max: f32,
    axis: Axis,
) -> Option<(f32, f32)> {
    let inv = ray.inv_direction[axis];
    let (near, far) = if inv < 0.0 {
        (slab_max, slab_min)
    } else {
        (slab_min, slab_max)
    };
    tmin = tmin.max((near - ray.origin[axis]) * inv);
    tmax = tmax.min((far - ray.origin[axis]) * inv);
    if tmax < tmin {
        return None;
    }
    Some((tmin, tmax))
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{thread_rng, Rng};

    use approx::*;

    fn gen_vec(rng: &mut impl Rng, scale: f32, offset: f32) -> Vec3A {
        Vec3A::new(
            rng.gen::<f32>() * scale + offset,
            rng.gen::<f32>() * scale + offset,
            rng.gen::<f32>() * scale + offset,
        )
    }

    #[test]
    fn sphere_surface_from_outside() {
        let sphere = Sphere::new(Vec3A::ZERO, 1.0);
        let ray = Ray::infinite(Vec3A::new(0.0, 0.0, -5.0), Vec3A::Z);
        let t = test_ray_sphere_surface(&ray, &sphere).unwrap();
        assert_abs_diff_eq!(t, 4.0, epsilon = HIT_EPSILON);
    }

    #[test]
    fn sphere_solid_from_inside() {
        let sphere = Sphere::new(Vec3A::ZERO, 1.0);
        let ray = Ray::infinite(Vec3A::ZERO, Vec3A::Z);
        assert_eq!(test_ray_sphere_solid(&ray, &sphere), Some(0.0));
    }

    #[test]
    fn sphere_surface_from_inside() {
        let sphere = Sphere::new(Vec3A::ZERO, 1.0);
        let ray = Ray::infinite(Vec3A::ZERO, Vec3A::Z);
        let t = test_ray_sphere_surface(&ray, &sphere).unwrap();
        assert_abs_diff_eq!(t, 1.0, epsilon = HIT_EPSILON);
    }

    #[test]
    fn sphere_behind_misses() {
        let sphere = Sphere::new(Vec3A::ZERO, 1.0);
        let ray = Ray::infinite(Vec3A::new(0.0, 0.0, 5.0), Vec3A::Z);
        assert!(test_ray_sphere_solid(&ray, &sphere).is_none());
        assert!(test_ray_sphere_surface(&ray, &sphere).is_none());
    }

    #[test]
    fn plane_hit_and_parallel() {
        let plane = Plane::from_point_normal(Vec3A::new(0.0, 2.0, 0.0), Vec3A::Y);
        let ray = Ray::infinite(Vec3A::ZERO, Vec3A::Y);
        assert_abs_diff_eq!(test_ray_plane(&ray, &plane).unwrap(), 2.0);

        let parallel = Ray::infinite(Vec3A::ZERO, Vec3A::X);
        assert!(test_ray_plane(&parallel, &plane).is_none());
    }

    #[test]
    fn triangle_front_concrete() {
        let v0 = Vec3A::ZERO;
        let v1 = Vec3A::X;
        let v2 = Vec3A::Y;
        let ray = Ray::infinite(Vec3A::new(0.25, 0.25, -1.0), Vec3A::Z);

        let (t, v, w) = test_ray_triangle_front(&ray, v0, v1, v2).unwrap();
        assert_abs_diff_eq!(t, 1.0, epsilon = HIT_EPSILON);
        assert_abs_diff_eq!(v, 0.25, epsilon = HIT_EPSILON);
        assert_abs_diff_eq!(w, 0.25, epsilon = HIT_EPSILON);

        // the same ray approaches the reversed winding from behind
        assert!(test_ray_triangle_front(&ray, v0, v2, v1).is_none());
        assert!(test_ray_triangle_back(&ray, v0, v2, v1).is_some());
    }

    #[test]
    fn triangle_both_reports_face() {
        let v0 = Vec3A::ZERO;
        let v1 = Vec3A::X;
        let v2 = Vec3A::Y;
        let ray = Ray::infinite(Vec3A::new(0.25, 0.25, -1.0), Vec3A::Z);

        let (result, t, _, _) = test_ray_triangle_both(&ray, v0, v1, v2).unwrap();
        assert_eq!(result, TestResult::Front);
        assert_abs_diff_eq!(t, 1.0, epsilon = HIT_EPSILON);

        let (result, _, _, _) = test_ray_triangle_both(&ray, v0, v2, v1).unwrap();
        assert_eq!(result, TestResult::Back);
    }

    #[test]
    fn triangle_respects_ray_extent() {
        let v0 = Vec3A::ZERO;
        let v1 = Vec3A::X;
        let v2 = Vec3A::Y;
        let short = Ray::new(Vec3A::new(0.25, 0.25, -1.0), Vec3A::Z, 0.5);
        assert!(test_ray_triangle_both(&short, v0, v1, v2).is_none());
    }

    #[test]
    fn triangle_degenerate_fails() {
        // zero-area triangle, and a ray in the triangle's plane
        let ray = Ray::infinite(Vec3A::new(0.25, 0.25, -1.0), Vec3A::Z);
        assert!(test_ray_triangle_both(&ray, Vec3A::ZERO, Vec3A::X, Vec3A::X * 2.0).is_none());

        let in_plane = Ray::infinite(Vec3A::new(-1.0, 0.25, 0.0), Vec3A::X);
        assert!(test_ray_triangle_both(&in_plane, Vec3A::ZERO, Vec3A::X, Vec3A::Y).is_none());
    }

    #[test]
    fn barycentric_round_trip() {
        let mut rng = thread_rng();
        for _ in 0..64 {
            let v0 = gen_vec(&mut rng, 2.0, -1.0);
            let v1 = v0 + gen_vec(&mut rng, 1.0, 0.5);
            let v2 = v0 + Vec3A::new(
                -rng.gen::<f32>() - 0.5,
                rng.gen::<f32>() + 0.5,
                rng.gen::<f32>() * 0.5,
            );

            // interior weights, kept away from the boundary
            let mut b = [
                rng.gen::<f32>() + 0.1,
                rng.gen::<f32>() + 0.1,
                rng.gen::<f32>() + 0.1,
            ];
            let sum = b[0] + b[1] + b[2];
            b.iter_mut().for_each(|w| *w /= sum);

            let target = v0 * b[0] + v1 * b[1] + v2 * b[2];
            let origin = target - Vec3A::new(0.0, 0.0, 6.0);
            let ray = Ray::infinite(origin, Vec3A::Z);

            let (_, t, v, w) = test_ray_triangle_both(&ray, v0, v1, v2)
                .expect("interior point must be hit");
            assert_abs_diff_eq!((1.0 - v - w) + v + w, 1.0, epsilon = 1.0e-4);

            let reconstructed = v0 * (1.0 - v - w) + v1 * v + v2 * w;
            assert_abs_diff_eq!(reconstructed.x, target.x, epsilon = 1.0e-3);
            assert_abs_diff_eq!(reconstructed.y, target.y, epsilon = 1.0e-3);
            assert_abs_diff_eq!(reconstructed.z, target.z, epsilon = 1.0e-3);

            let point = ray.origin + ray.direction * t;
            assert_abs_diff_eq!(point.distance(target), 0.0, epsilon = 1.0e-3);
        }
    }

    #[test]
    fn shared_edge_attribution() {
        // two triangles joined along a - b, generic vertices
        let a = Vec3A::new(0.2, 0.1, 0.3);
        let b = Vec3A::new(1.3, 0.4, 0.2);
        let c = Vec3A::new(0.5, 1.6, 0.4);
        // coplanar with (a, b, c), on the far side of the edge
        let d = a + b - c;

        // perpendicular offset inside the common plane, pushing the sample
        // point just off the edge toward either triangle
        let across = (c - a) - (b - a) * ((c - a).dot(b - a) / (b - a).length_squared());
        let across = across.normalize_or_zero();

        for i in 0..32 {
            let s = (i as f32 + 0.5) / 32.0;
            let side = if i % 2 == 0 { 1.0e-3 } else { -1.0e-3 };
            let target = a + (b - a) * s + across * side;
            let origin = Vec3A::new(0.6, 0.2, -5.0);
            let ray = Ray::infinite(origin, target - origin);

            let hit_first = test_ray_triangle_both(&ray, a, b, c).is_some();
            let hit_second = test_ray_triangle_both(&ray, b, a, d).is_some();
            assert!(
                hit_first ^ hit_second,
                "edge-crossing ray must strike exactly one triangle (s = {})",
                s
            );
        }
    }

    #[test]
    fn rectangle_hits_both_halves() {
        let p0 = Vec3A::ZERO;
        let p1 = Vec3A::X;
        let p2 = Vec3A::new(1.0, 1.0, 0.0);
        let p3 = Vec3A::Y;

        let lower = Ray::infinite(Vec3A::new(0.75, 0.25, -1.0), Vec3A::Z);
        assert_abs_diff_eq!(
            test_ray_rectangle(&lower, p0, p1, p2, p3).unwrap(),
            1.0,
            epsilon = HIT_EPSILON
        );

        let upper = Ray::infinite(Vec3A::new(0.25, 0.75, -1.0), Vec3A::Z);
        assert_abs_diff_eq!(
            test_ray_rectangle(&upper, p0, p1, p2, p3).unwrap(),
            1.0,
            epsilon = HIT_EPSILON
        );

        let outside = Ray::infinite(Vec3A::new(1.5, 1.5, -1.0), Vec3A::Z);
        assert!(test_ray_rectangle(&outside, p0, p1, p2, p3).is_none());
    }

    #[test]
    fn aabb_window_narrows() {
        let ray = Ray::infinite(Vec3A::new(-5.0, 0.5, 0.5), Vec3A::X);
        let (tmin, tmax) =
            test_ray_aabb(0.0, ray.t, &ray, Vec3A::ZERO, Vec3A::ONE).unwrap();
        assert_abs_diff_eq!(tmin, 5.0, epsilon = HIT_EPSILON);
        assert_abs_diff_eq!(tmax, 6.0, epsilon = HIT_EPSILON);

        // same box approached along -x
        let back = Ray::infinite(Vec3A::new(5.0, 0.5, 0.5), -Vec3A::X);
        let (tmin, _) = test_ray_aabb(0.0, back.t, &back, Vec3A::ZERO, Vec3A::ONE).unwrap();
        assert_abs_diff_eq!(tmin, 4.0, epsilon = HIT_EPSILON);
    }

    #[test]
    fn slab_matches_box_axis() {
        let ray = Ray::infinite(Vec3A::new(-5.0, 0.5, 0.5), Vec3A::X);
        let (tmin, tmax) = test_ray_slab(0.0, ray.t, &ray, 0.0, 1.0, Axis::X).unwrap();
        assert_abs_diff_eq!(tmin, 5.0, epsilon = HIT_EPSILON);
        assert_abs_diff_eq!(tmax, 6.0, epsilon = HIT_EPSILON);

        // the y slab does not constrain a ray running along x
        let (tmin, tmax) = test_ray_slab(0.0, ray.t, &ray, 0.0, 1.0, Axis::Y).unwrap();
        assert_eq!(tmin, 0.0);
        assert!(tmax >= 1.0e30);
    }
}
