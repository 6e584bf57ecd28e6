use glam::Vec3A;

use crate::{raytest::test_ray_aabb, Axis, Ray};

/// Axis-aligned bounding box. The default value is the inverted "empty"
/// box (`min = +MAX`, `max = -MAX`) so growing it converges from nothing.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Vec3A,
    pub max: Vec3A,
}

impl Default for Aabb {
    fn default() -> Self {
        Self {
            min: Vec3A::splat(f32::MAX),
            max: Vec3A::splat(-f32::MAX),
        }
    }
}

impl Aabb {
    #[inline]
    pub fn new(min: Vec3A, max: Vec3A) -> Self {
        Self { min, max }
    }

    /// Grow the box to contain a new point
    #[inline]
    pub fn grow(&mut self, point: Vec3A) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grow the box to contain another box
    #[inline]
    pub fn extend(&mut self, bbox: &Aabb) {
        self.min = self.min.min(bbox.min);
        self.max = self.max.max(bbox.max);
    }

    /// If the box is valid (min <= max on every axis)
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    #[inline]
    pub fn extent(&self) -> Vec3A {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Vec3A {
        (self.min + self.max) * 0.5
    }

    /// Axis along which the box is widest
    pub fn max_extent_axis(&self) -> Axis {
        let extent = self.extent();
        let mut axis = if extent.x < extent.y { Axis::Y } else { Axis::X };
        if extent[axis] < extent.z {
            axis = Axis::Z;
        }
        axis
    }

    /// Half the surface area; the quantity minimized by the SAH build.
    pub fn half_area(&self) -> f32 {
        let d = self.extent();
        d.x * d.y + d.y * d.z + d.z * d.x
    }

    /// Slab test against the ray's current `[0, t]` window.
    #[inline]
    pub fn test_ray(&self, ray: &Ray) -> Option<(f32, f32)> {
        test_ray_aabb(0.0, ray.t, ray, self.min, self.max)
    }

    /// Entry distance of the ray, or infinity on a miss. Used to order
    /// near/far children during accelerator traversal.
    #[inline]
    pub fn hit_distance(&self, ray: &Ray) -> f32 {
        match self.test_ray(ray) {
            Some((tmin, _)) => tmin,
            None => f32::INFINITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty_and_converges() {
        let mut aabb = Aabb::default();
        assert!(!aabb.is_valid());

        aabb.grow(Vec3A::new(1.0, -2.0, 3.0));
        aabb.grow(Vec3A::new(-1.0, 2.0, 0.0));
        assert!(aabb.is_valid());
        assert_eq!(aabb.min, Vec3A::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3A::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn extend_merges_boxes() {
        let mut aabb = Aabb::default();
        aabb.extend(&Aabb::new(Vec3A::ZERO, Vec3A::ONE));
        aabb.extend(&Aabb::new(Vec3A::splat(-2.0), Vec3A::splat(-1.0)));
        assert_eq!(aabb.min, Vec3A::splat(-2.0));
        assert_eq!(aabb.max, Vec3A::ONE);
    }

    #[test]
    fn max_extent_axis_picks_widest() {
        let aabb = Aabb::new(Vec3A::ZERO, Vec3A::new(1.0, 3.0, 2.0));
        assert_eq!(aabb.max_extent_axis(), Axis::Y);
    }

    #[test]
    fn half_area_of_unit_cube() {
        let aabb = Aabb::new(Vec3A::ZERO, Vec3A::ONE);
        assert_eq!(aabb.half_area(), 3.0);
    }

    #[test]
    fn point_box_hits_only_rays_through_it() {
        let point = Vec3A::new(1.0, 1.0, 1.0);
        let aabb = Aabb::new(point, point);

        let through = Ray::infinite(Vec3A::ZERO, point);
        assert!(aabb.test_ray(&through).is_some());

        let past = Ray::infinite(Vec3A::ZERO, Vec3A::new(1.0, 1.0, 0.9));
        assert!(aabb.test_ray(&past).is_none());
    }

    #[test]
    fn hit_distance_orders_boxes() {
        let ray = Ray::infinite(Vec3A::ZERO, Vec3A::X);
        let near = Aabb::new(Vec3A::new(1.0, -1.0, -1.0), Vec3A::new(2.0, 1.0, 1.0));
        let far = Aabb::new(Vec3A::new(5.0, -1.0, -1.0), Vec3A::new(6.0, 1.0, 1.0));
        assert!(near.hit_distance(&ray) < far.hit_distance(&ray));
        assert_eq!(
            far.hit_distance(&Ray::infinite(Vec3A::ZERO, -Vec3A::X)),
            f32::INFINITY
        );
    }
}
