use glam::Vec3A;

use crate::Ray;

/// Pinhole camera, the boundary producer of the rays fed into scene
/// queries. Screen coordinates map through the basis built by
/// [`Camera::look_at`] and the frustum set by [`Camera::perspective`].
#[derive(Debug, Clone)]
pub struct Camera {
    inv_half_width: f32,
    inv_half_height: f32,
    position: Vec3A,
    right: Vec3A,
    up: Vec3A,
    forward: Vec3A,
    near_clip: f32,
    far_clip: f32,
    ray_dx: f32,
    ray_dy: f32,
}

impl Camera {
    pub const DEFAULT_FOV_RADIANS: f32 = 60.0 * std::f32::consts::PI / 180.0;
    pub const DEFAULT_NEAR: f32 = 1.0e-2;
    pub const DEFAULT_FAR: f32 = 1.0e2;

    /// Above this |cos| between forward and up the basis would collapse
    const ALMOST_PARALLEL: f32 = 0.999;
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            inv_half_width: 1.0,
            inv_half_height: 1.0,
            position: Vec3A::ZERO,
            right: Vec3A::X,
            up: Vec3A::Y,
            forward: Vec3A::Z,
            near_clip: Self::DEFAULT_NEAR,
            far_clip: Self::DEFAULT_FAR,
            ray_dx: 1.0,
            ray_dy: 1.0,
        }
    }
}

impl Camera {
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        debug_assert!(width > 0 && height > 0);
        self.inv_half_width = 2.0 / width as f32;
        self.inv_half_height = 2.0 / height as f32;
    }

    #[inline]
    pub fn position(&self) -> Vec3A {
        self.position
    }

    #[inline]
    pub fn set_clip(&mut self, near: f32, far: f32) {
        self.near_clip = near;
        self.far_clip = far;
    }

    #[inline]
    pub fn near_clip(&self) -> f32 {
        self.near_clip
    }

    pub fn perspective(&mut self, aspect: f32, fov_x: f32) {
        let fov = (0.5 * fov_x).tan();
        self.ray_dx = fov;
        self.ray_dy = fov / aspect;
    }

    pub fn look_at(&mut self, eye: Vec3A, at: Vec3A, up: Vec3A) {
        self.position = eye;
        self.forward = (at - eye).normalize_or_zero();

        let cs = self.forward.dot(up);
        let up = if Self::ALMOST_PARALLEL < cs.abs() {
            Vec3A::new(self.forward.z, self.forward.x, self.forward.y)
        } else {
            up
        };

        self.right = self.forward.cross(up).normalize_or_zero();
        self.up = self.right.cross(self.forward).normalize_or_zero();
    }

    /// Map a screen position to its primary ray. The extent is the far
    /// clip distance.
    pub fn generate_ray(&self, screen_x: f32, screen_y: f32) -> Ray {
        let dx = self.right * ((self.inv_half_width * screen_x - 1.0) * self.ray_dx);
        let dy = self.up * ((1.0 - self.inv_half_height * screen_y) * self.ray_dy);
        Ray::new(self.position, dx + dy + self.forward, self.far_clip)
    }
}
