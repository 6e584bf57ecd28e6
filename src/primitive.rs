use glam::{Mat3A, Mat4, Vec3A};

use crate::{
    raytest::test_ray_triangle_both, Intersection, Ray, TestResult, Triangle, TriangleProxy,
};

/// One batch of vertex data and the triangles indexing into it. The
/// buffers are exclusively owned; a primitive acting as a per-frame
/// world-space copy recycles them across [`Primitive::refine`] calls.
#[derive(Debug, Default)]
pub struct Primitive {
    positions: Vec<Vec3A>,
    normals: Option<Vec<Vec3A>>,
    triangles: Vec<Triangle>,
}

impl Primitive {
    /// `normals`, when present, must run parallel to `positions`; every
    /// triangle index must address a valid vertex.
    pub fn new(
        positions: Vec<Vec3A>,
        normals: Option<Vec<Vec3A>>,
        triangles: Vec<Triangle>,
    ) -> Self {
        if let Some(normals) = &normals {
            debug_assert_eq!(normals.len(), positions.len());
        }
        debug_assert!(triangles
            .iter()
            .all(|tri| tri.indices.iter().all(|&i| (i as usize) < positions.len())));
        Self {
            positions,
            normals,
            triangles,
        }
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn position(&self, index: usize) -> Vec3A {
        self.positions[index]
    }

    #[inline]
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    #[inline]
    pub fn normal(&self, index: usize) -> Vec3A {
        debug_assert!(self.has_normals());
        self.normals.as_ref().map_or(Vec3A::ZERO, |n| n[index])
    }

    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn triangle(&self, index: usize) -> Triangle {
        self.triangles[index]
    }

    /// Corner positions of one triangle
    #[inline]
    pub fn triangle_vertices(&self, index: usize) -> (Vec3A, Vec3A, Vec3A) {
        let tri = self.triangles[index];
        (
            self.positions[tri.indices[0] as usize],
            self.positions[tri.indices[1] as usize],
            self.positions[tri.indices[2] as usize],
        )
    }

    /// Rebuild this primitive as the world-space image of `src`.
    ///
    /// Positions go through the full matrix, normals through its upper 3x3
    /// without renormalization, which is only correct under uniform scale;
    /// callers feeding non-uniform scale renormalize downstream. Triangle
    /// indices are copied as-is since the transform preserves topology.
    /// Buffer capacity only ever grows, so refining the same slot every
    /// frame settles into zero allocation.
    pub fn refine(&mut self, src: &Primitive, world: &Mat4) {
        self.positions.clear();
        self.positions
            .extend(src.positions.iter().map(|&p| world.transform_point3a(p)));

        match &src.normals {
            Some(src_normals) => {
                let normal_matrix = Mat3A::from_mat4(*world);
                let dst = self.normals.get_or_insert_with(Vec::new);
                dst.clear();
                dst.extend(src_normals.iter().map(|&n| normal_matrix * n));
            }
            None => self.normals = None,
        }

        self.triangles.clear();
        self.triangles.extend_from_slice(&src.triangles);
    }

    /// Append one proxy per triangle to the frame's proxy buffer
    pub fn append_proxies(&self, mesh: u32, primitive: u32, proxies: &mut Vec<TriangleProxy>) {
        for index in 0..self.triangles.len() as u32 {
            proxies.push(TriangleProxy::new(mesh, primitive, index));
        }
    }

    /// Brute-force both-faces test over every triangle, keeping the
    /// closest hit and shrinking the ray extent as it goes.
    pub fn test(&self, intersection: &mut Intersection, ray: &mut Ray) -> TestResult {
        for index in 0..self.triangles.len() {
            let (p0, p1, p2) = self.triangle_vertices(index);
            let Some((result, t, v, w)) = test_ray_triangle_both(ray, p0, p1, p2) else {
                continue;
            };
            if intersection.t <= t {
                continue;
            }
            ray.t = t;
            intersection.result = result;
            intersection.t = t;
            intersection.b0 = 1.0 - v - w;
            intersection.b1 = v;
            intersection.b2 = w;
            intersection.point = ray.origin + ray.direction * t;
            intersection.geometric_normal = (p1 - p0).cross(p2 - p0).normalize_or_zero();
            intersection.shading_normal = if self.has_normals() {
                let tri = self.triangles[index];
                self.normal(tri.indices[0] as usize) * intersection.b0
                    + self.normal(tri.indices[1] as usize) * intersection.b1
                    + self.normal(tri.indices[2] as usize) * intersection.b2
            } else {
                intersection.geometric_normal
            };
        }
        intersection.result
    }
}
