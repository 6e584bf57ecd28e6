use glam::Vec3A;

/// Plane in constant-normal form: `dot(normal, p) + d == 0`.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub normal: Vec3A,
    pub d: f32,
}

impl Plane {
    #[inline]
    pub fn new(normal: Vec3A, d: f32) -> Self {
        Self { normal, d }
    }

    /// Plane through `point` with the given normal
    #[inline]
    pub fn from_point_normal(point: Vec3A, normal: Vec3A) -> Self {
        Self {
            normal,
            d: -normal.dot(point),
        }
    }

    /// Signed distance from the plane, scaled by the normal's length
    #[inline]
    pub fn distance(&self, point: Vec3A) -> f32 {
        self.normal.dot(point) + self.d
    }

    pub fn normalize(&mut self) {
        let length = self.normal.length();
        debug_assert!(length > 0.0, "degenerate plane normal");
        let inv = 1.0 / length;
        self.normal *= inv;
        self.d *= inv;
    }

    #[inline]
    pub fn translate(&mut self, offset: Vec3A) {
        self.d -= offset.dot(self.normal);
    }
}
