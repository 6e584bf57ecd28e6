use glam::Mat4;

use crate::{Intersection, Primitive, Ray, TestResult};

/// Ordered collection of primitives. A scene keeps two renditions of every
/// mesh: the source in authoring space and a refined copy rebuilt in world
/// space each frame.
#[derive(Debug, Default)]
pub struct Mesh {
    primitives: Vec<Primitive>,
}

impl Mesh {
    #[inline]
    pub fn new(primitives: Vec<Primitive>) -> Self {
        Self { primitives }
    }

    pub fn clear(&mut self) {
        self.primitives.clear();
    }

    #[inline]
    pub fn num_primitives(&self) -> usize {
        self.primitives.len()
    }

    #[inline]
    pub fn primitive(&self, index: usize) -> &Primitive {
        &self.primitives[index]
    }

    #[inline]
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Rebuild this mesh as the world-space image of `src`
    pub fn refine(&mut self, src: &Mesh, world: &Mat4) {
        self.primitives
            .resize_with(src.primitives.len(), Primitive::default);
        for (dst, src) in self.primitives.iter_mut().zip(&src.primitives) {
            dst.refine(src, world);
        }
    }

    /// Reference path: brute-force every primitive, keeping the closest
    /// hit. This is what queries fall back to when no accelerator exists,
    /// and what the accelerator is validated against.
    pub fn test(&self, intersection: &mut Intersection, ray: &mut Ray) -> TestResult {
        for primitive in &self.primitives {
            primitive.test(intersection, ray);
        }
        intersection.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use glam::Vec3A;

    use approx::*;

    use crate::Triangle;

    fn wall(z: f32) -> Primitive {
        Primitive::new(
            vec![
                Vec3A::new(-1.0, -1.0, z),
                Vec3A::new(1.0, -1.0, z),
                Vec3A::new(0.0, 1.0, z),
            ],
            None,
            vec![Triangle::new(0, 1, 2)],
        )
    }

    #[test]
    fn closest_hit_across_primitives() {
        let mesh = Mesh::new(vec![wall(5.0), wall(2.0), wall(8.0)]);
        let mut intersection = Intersection::default();
        let mut ray = Ray::infinite(Vec3A::new(0.0, 0.0, -1.0), Vec3A::Z);

        assert!(mesh.test(&mut intersection, &mut ray).is_hit());
        assert_abs_diff_eq!(intersection.t, 3.0, epsilon = 1.0e-5);
        assert_abs_diff_eq!(ray.t, 3.0, epsilon = 1.0e-5);
    }

    #[test]
    fn refine_translates_every_primitive() {
        let src = Mesh::new(vec![wall(1.0), wall(2.0)]);
        let mut refined = Mesh::default();
        refined.refine(&src, &Mat4::from_translation(glam::Vec3::new(0.0, 0.0, 10.0)));

        assert_eq!(refined.num_primitives(), 2);
        assert_abs_diff_eq!(refined.primitive(0).position(0).z, 11.0, epsilon = 1.0e-5);
        assert_abs_diff_eq!(refined.primitive(1).position(0).z, 12.0, epsilon = 1.0e-5);
    }
}
