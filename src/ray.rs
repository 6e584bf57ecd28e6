use glam::Vec3A;

/// Ray with a parametric extent. `t` is the current maximum hit distance;
/// intersection routines shrink it as closer hits are found, so it doubles
/// as the running nearest-hit bound during a query.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3A,
    pub direction: Vec3A,
    pub inv_direction: Vec3A,
    pub t: f32,
}

impl Default for Ray {
    fn default() -> Self {
        Self::new(Vec3A::ZERO, Vec3A::X, 1.0)
    }
}

impl Ray {
    /// `direction` must be a non-zero vector; it is normalized here.
    pub fn new(origin: Vec3A, direction: Vec3A, t: f32) -> Self {
        debug_assert!(
            direction.length_squared() > 0.0,
            "zero-length ray direction"
        );
        let mut ray = Self {
            origin,
            direction: direction.normalize_or_zero(),
            inv_direction: Vec3A::ZERO,
            t,
        };
        ray.invert_direction();
        ray
    }

    /// Create a ray with infinite extent (a proper ray)
    #[inline]
    pub fn infinite(origin: Vec3A, direction: Vec3A) -> Self {
        Self::new(origin, direction, f32::INFINITY)
    }

    /// Derive the per-axis reciprocal of the direction. Near-zero components
    /// saturate to +-MAX, carrying the sign of the component, so the slab
    /// test never multiplies 0 by infinity yet keeps its bounds ordered.
    pub fn invert_direction(&mut self) {
        for i in 0..3 {
            let d = self.direction[i];
            self.inv_direction[i] = if 0.0 <= d {
                if d <= f32::EPSILON {
                    f32::MAX
                } else {
                    1.0 / d
                }
            } else if -f32::EPSILON <= d {
                -f32::MAX
            } else {
                1.0 / d
            };
        }
    }

    /// Per-axis flags, true where the inverse direction is negative. This is
    /// the precomputed input of the batched slab test.
    #[inline]
    pub fn direction_signs(&self) -> [bool; 3] {
        [
            self.inv_direction.x < 0.0,
            self.inv_direction.y < 0.0,
            self.inv_direction.z < 0.0,
        ]
    }
}
