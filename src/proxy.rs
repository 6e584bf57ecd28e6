use bytemuck::{Pod, Zeroable};
use glam::Vec3A;

use crate::{raytest::test_ray_triangle_both, Aabb, Mesh, Ray, TestResult};

/// Non-owning handle to one triangle of a refined primitive, the payload
/// the accelerator sorts and returns from queries. A proxy is an index
/// triple into the mesh arena it was generated from; it stays valid only
/// for that frame's refined generation and the whole buffer is rebuilt,
/// never patched, on every frame update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct TriangleProxy {
    pub mesh: u32,
    pub primitive: u32,
    pub triangle: u32,
}

impl TriangleProxy {
    #[inline]
    pub fn new(mesh: u32, primitive: u32, triangle: u32) -> Self {
        Self {
            mesh,
            primitive,
            triangle,
        }
    }

    #[inline]
    fn vertices(&self, meshes: &[Mesh]) -> (Vec3A, Vec3A, Vec3A) {
        meshes[self.mesh as usize]
            .primitive(self.primitive as usize)
            .triangle_vertices(self.triangle as usize)
    }

    pub fn centroid(&self, meshes: &[Mesh]) -> Vec3A {
        let (v0, v1, v2) = self.vertices(meshes);
        (v0 + v1 + v2) / 3.0
    }

    pub fn bbox(&self, meshes: &[Mesh]) -> Aabb {
        let (v0, v1, v2) = self.vertices(meshes);
        let mut aabb = Aabb::default();
        aabb.grow(v0);
        aabb.grow(v1);
        aabb.grow(v2);
        aabb
    }

    /// Both-faces triangle test against the referenced geometry
    pub fn test_ray(
        &self,
        meshes: &[Mesh],
        ray: &Ray,
    ) -> Option<(TestResult, f32, f32, f32)> {
        let (v0, v1, v2) = self.vertices(meshes);
        test_ray_triangle_both(ray, v0, v1, v2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::*;

    use crate::{Primitive, Triangle};

    fn single_triangle_arena() -> Vec<Mesh> {
        vec![Mesh::new(vec![Primitive::new(
            vec![Vec3A::ZERO, Vec3A::new(3.0, 0.0, 0.0), Vec3A::new(0.0, 3.0, 0.0)],
            None,
            vec![Triangle::new(0, 1, 2)],
        )])]
    }

    #[test]
    fn centroid_and_bbox_resolve_through_arena() {
        let meshes = single_triangle_arena();
        let proxy = TriangleProxy::new(0, 0, 0);

        assert_abs_diff_eq!(proxy.centroid(&meshes).x, 1.0, epsilon = 1.0e-6);
        assert_abs_diff_eq!(proxy.centroid(&meshes).y, 1.0, epsilon = 1.0e-6);

        let aabb = proxy.bbox(&meshes);
        assert_eq!(aabb.min, Vec3A::ZERO);
        assert_eq!(aabb.max, Vec3A::new(3.0, 3.0, 0.0));
    }

    #[test]
    fn proxy_ray_test_matches_geometry() {
        let meshes = single_triangle_arena();
        let proxy = TriangleProxy::new(0, 0, 0);

        let ray = Ray::infinite(Vec3A::new(1.0, 1.0, -4.0), Vec3A::Z);
        let (result, t, _, _) = proxy.test_ray(&meshes, &ray).unwrap();
        assert!(result.is_hit());
        assert_abs_diff_eq!(t, 4.0, epsilon = 1.0e-5);
    }
}
