use glam::Vec3A;

use crate::TestResult;

/// Per-query hit aggregate. A fresh value carries the no-hit sentinel
/// `t = +infinity`; a successful query fills in the barycentric weights
/// (summing to one), the hit point and both normals.
#[derive(Debug, Clone, Copy)]
pub struct Intersection {
    pub result: TestResult,
    pub t: f32,
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub point: Vec3A,
    pub shading_normal: Vec3A,
    pub geometric_normal: Vec3A,
}

impl Default for Intersection {
    fn default() -> Self {
        Self {
            result: TestResult::Fail,
            t: f32::INFINITY,
            b0: 0.0,
            b1: 0.0,
            b2: 0.0,
            point: Vec3A::ZERO,
            shading_normal: Vec3A::ZERO,
            geometric_normal: Vec3A::ZERO,
        }
    }
}

impl Intersection {
    #[inline]
    pub fn is_hit(&self) -> bool {
        self.result.is_hit()
    }
}
