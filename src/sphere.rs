use glam::Vec3A;

use crate::Aabb;

/// Sphere
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    pub center: Vec3A,
    pub radius: f32,
}

impl Sphere {
    #[inline]
    pub fn new(center: Vec3A, radius: f32) -> Self {
        Self { center, radius }
    }

    #[inline]
    pub fn contains(&self, point: Vec3A) -> bool {
        self.center.distance_squared(point) <= self.radius * self.radius
    }

    #[inline]
    pub fn translate(&mut self, offset: Vec3A) {
        self.center += offset;
    }

    pub fn bbox(&self) -> Aabb {
        let r = Vec3A::splat(self.radius);
        Aabb::new(self.center - r, self.center + r)
    }
}
