//! Binned-SAH bounding volume hierarchy over triangle proxies.
//!
//! The tree is rebuilt from scratch every frame right after the refined
//! meshes; it never refits. Geometry is shared with the owning scene
//! through `Arc<RwLock<..>>` and the proxy array handed to [`BinnedBvh::build`]
//! is snapshotted, so the caller's buffer stays frame-stable.

use std::sync::Arc;

use glam::Vec3A;

use log::debug;

use parking_lot::RwLock;

use strum::IntoEnumIterator;

use crate::{
    raytest::HIT_EPSILON, Aabb, Axis, Mesh, Ray, TestResult, TriangleProxy,
};

/// Number of candidate intervals evaluated per axis when binning
const BIN_COUNT: usize = 8;

/// Single-ray query result. `proxy` identifies the winning triangle;
/// `result` reports the struck face.
#[derive(Debug, Clone, Copy)]
pub struct HitRecord {
    pub result: TestResult,
    pub t: f32,
    pub v: f32,
    pub w: f32,
    pub proxy: TriangleProxy,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BvhNode {
    pub aabb: Aabb,
    left_first: u32,
    pub prim_count: u32,
}

impl BvhNode {
    /// SAH cost of keeping this node a leaf
    #[inline]
    pub fn leaf_cost(&self) -> f32 {
        self.prim_count as f32 * self.aabb.half_area()
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.prim_count > 0
    }

    #[inline]
    pub fn left_child(&self) -> u32 {
        debug_assert!(!self.is_leaf());
        self.left_first
    }

    #[inline]
    pub fn right_child(&self) -> u32 {
        self.left_child() + 1
    }

    #[inline]
    pub fn first_prim(&self) -> u32 {
        debug_assert!(self.is_leaf());
        self.left_first
    }

    #[inline]
    pub fn setup_prims(&mut self, first_prim: u32, prim_count: u32) {
        self.prim_count = prim_count;
        self.left_first = first_prim;
    }

    #[inline]
    pub fn setup_left_child(&mut self, left_child: u32) {
        self.prim_count = 0;
        self.left_first = left_child;
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitPlane {
    axis: Axis,
    position: f32,
    should_split: bool,
}

impl Default for SplitPlane {
    fn default() -> Self {
        Self {
            axis: Axis::X,
            position: f32::INFINITY,
            should_split: false,
        }
    }
}

/// Accelerator over the scene's per-frame triangle proxies
#[derive(Default)]
pub struct BinnedBvh {
    meshes: Arc<RwLock<Vec<Mesh>>>,
    proxies: Vec<TriangleProxy>,
    proxy_ids: Vec<u32>,
    nodes: Vec<BvhNode>,
    root_node_id: u32,
    nodes_used: u32,
}

impl BinnedBvh {
    /// Max stack size for the traverse operation
    const MAX_STACK_SIZE: usize = 64;

    /// Attach the refined-mesh arena the proxies resolve against
    #[inline]
    pub fn init(&mut self, meshes: Arc<RwLock<Vec<Mesh>>>) {
        self.meshes = meshes;
    }

    /// Rebuild the tree over a caller-owned, frame-stable proxy array
    pub fn build(&mut self, proxies: &[TriangleProxy]) {
        self.proxies.clear();
        self.proxies.extend_from_slice(proxies);

        let meshes_arc = self.meshes.clone();
        let meshes_ref = meshes_arc.read();
        let meshes: &[Mesh] = &meshes_ref;

        let count = self.proxies.len();
        let bboxes: Vec<Aabb> = self.proxies.iter().map(|p| p.bbox(meshes)).collect();
        let centroids: Vec<Vec3A> = self.proxies.iter().map(|p| p.centroid(meshes)).collect();

        self.proxy_ids.clear();
        self.proxy_ids.extend(0..count as u32);

        self.root_node_id = 1;
        self.nodes_used = 2; // skip one so sibling pairs share a cache line

        self.nodes.clear();
        self.nodes
            .resize(if count > 0 { 2 * count } else { 2 }, Default::default());

        self.nodes[self.root_node_id as usize].setup_prims(0, count as u32);

        if count > 0 {
            self.build_node_bounds(&bboxes, self.root_node_id);
            self.subdivide(&bboxes, &centroids, self.root_node_id);
        }

        debug!("bvh build: {} proxies, {} nodes", count, self.nodes_used);
    }

    fn build_node_bounds(&mut self, bboxes: &[Aabb], node_id: u32) {
        let first = self.nodes[node_id as usize].first_prim() as usize;
        let count = self.nodes[node_id as usize].prim_count as usize;

        let mut aabb = Aabb::default();
        for i in 0..count {
            aabb.extend(&bboxes[self.proxy_ids[first + i] as usize]);
        }
        self.nodes[node_id as usize].aabb = aabb;
    }

    /// Pick the cheapest binned SAH split, or none when staying a leaf is
    /// cheaper
    fn find_split_plane(
        &self,
        node: &BvhNode,
        bboxes: &[Aabb],
        centroids: &[Vec3A],
    ) -> SplitPlane {
        if node.prim_count <= 2 {
            return SplitPlane::default();
        }

        let first = node.first_prim() as usize;
        let count = node.prim_count as usize;

        let mut best_axis = Axis::X;
        let mut best_position = 0.0_f32;
        let mut best_cost = f32::INFINITY;

        let mut cmin = Vec3A::splat(f32::MAX);
        let mut cmax = Vec3A::splat(-f32::MAX);
        for i in 0..count {
            let centroid = centroids[self.proxy_ids[first + i] as usize];
            cmin = cmin.min(centroid);
            cmax = cmax.max(centroid);
        }

        #[derive(Debug, Clone, Copy, Default)]
        struct Bin {
            bounds: Aabb,
            count: u32,
        }

        for axis in Axis::iter() {
            let bounds_min = cmin[axis];
            let bounds_max = cmax[axis];

            if approx::abs_diff_eq!(bounds_min, bounds_max, epsilon = HIT_EPSILON) {
                continue;
            }

            let mut bins = [Bin::default(); BIN_COUNT];

            let scale = BIN_COUNT as f32 / (bounds_max - bounds_min);
            for i in 0..count {
                let id = self.proxy_ids[first + i] as usize;
                let bin_id = usize::min(
                    BIN_COUNT - 1,
                    ((centroids[id][axis] - bounds_min) * scale) as usize,
                );
                bins[bin_id].count += 1;
                bins[bin_id].bounds.extend(&bboxes[id]);
            }

            let mut left_area = [0.0_f32; BIN_COUNT - 1];
            let mut right_area = [0.0_f32; BIN_COUNT - 1];
            let mut left_count = [0_u32; BIN_COUNT - 1];
            let mut right_count = [0_u32; BIN_COUNT - 1];

            let mut left_box = Aabb::default();
            let mut right_box = Aabb::default();
            let mut left_sum = 0_u32;
            let mut right_sum = 0_u32;

            for i in 0..(BIN_COUNT - 1) {
                left_sum += bins[i].count;
                left_count[i] = left_sum;
                left_box.extend(&bins[i].bounds);
                left_area[i] = left_box.half_area();

                right_sum += bins[BIN_COUNT - 1 - i].count;
                right_count[BIN_COUNT - 2 - i] = right_sum;
                right_box.extend(&bins[BIN_COUNT - 1 - i].bounds);
                right_area[BIN_COUNT - 2 - i] = right_box.half_area();
            }

            let scale = (bounds_max - bounds_min) / BIN_COUNT as f32;
            for i in 0..(BIN_COUNT - 1) {
                let plane_cost =
                    left_count[i] as f32 * left_area[i] + right_count[i] as f32 * right_area[i];
                if plane_cost < best_cost {
                    best_position = bounds_min + scale * (i + 1) as f32;
                    best_axis = axis;
                    best_cost = plane_cost;
                }
            }
        }

        if best_cost >= node.leaf_cost() {
            return SplitPlane::default();
        }

        SplitPlane {
            axis: best_axis,
            position: best_position,
            should_split: true,
        }
    }

    fn subdivide(&mut self, bboxes: &[Aabb], centroids: &[Vec3A], node_id: u32) {
        let (split, first_prim, prim_count) = {
            let node = &self.nodes[node_id as usize];
            debug_assert!(node.is_leaf());
            (
                self.find_split_plane(node, bboxes, centroids),
                node.first_prim(),
                node.prim_count,
            )
        };

        if !split.should_split {
            return;
        }

        // in-place partition of the id range around the split plane
        let mut i = first_prim as isize;
        let mut j = i + prim_count as isize - 1;
        while i <= j {
            if centroids[self.proxy_ids[i as usize] as usize][split.axis] < split.position {
                i += 1;
            } else {
                self.proxy_ids.swap(i as usize, j as usize);
                j -= 1;
            }
        }

        let i = i as usize;
        let left_count = i - first_prim as usize;
        if left_count == 0 || left_count == prim_count as usize {
            // the plane separated nothing
            return;
        }

        let left_child = self.nodes_used;
        self.nodes_used += 1;
        let right_child = self.nodes_used;
        self.nodes_used += 1;

        self.nodes[node_id as usize].setup_left_child(left_child);
        self.nodes[left_child as usize].setup_prims(first_prim, left_count as u32);
        self.nodes[right_child as usize].setup_prims(i as u32, prim_count - left_count as u32);

        self.build_node_bounds(bboxes, left_child);
        self.build_node_bounds(bboxes, right_child);
        self.subdivide(bboxes, centroids, left_child);
        self.subdivide(bboxes, centroids, right_child);
    }

    /// Single-ray query: closest both-faces triangle hit, or `None`
    pub fn intersect(&self, ray: &Ray) -> Option<HitRecord> {
        if self.proxies.is_empty() {
            return None;
        }

        let meshes_ref = self.meshes.read();
        let meshes: &[Mesh] = &meshes_ref;

        let mut ray = *ray;
        let mut best: Option<HitRecord> = None;

        let mut node = &self.nodes[self.root_node_id as usize];
        if node.aabb.hit_distance(&ray).is_infinite() {
            return None;
        }

        let mut stack: [Option<&BvhNode>; Self::MAX_STACK_SIZE] =
            [Default::default(); Self::MAX_STACK_SIZE];
        let mut stack_ptr = 0_usize;

        loop {
            if node.is_leaf() {
                let first_prim = node.first_prim();

                for i in 0..node.prim_count {
                    let proxy = self.proxies[self.proxy_ids[(first_prim + i) as usize] as usize];
                    if let Some((result, t, v, w)) = proxy.test_ray(meshes, &ray) {
                        // the both-faces test already rejects t beyond the
                        // shrinking extent
                        ray.t = t;
                        best = Some(HitRecord {
                            result,
                            t,
                            v,
                            w,
                            proxy,
                        });
                    }
                }

                if stack_ptr == 0 {
                    break;
                }
                stack_ptr -= 1;
                node = stack[stack_ptr].unwrap();
            } else {
                let child1 = &self.nodes[node.left_child() as usize];
                let child2 = &self.nodes[node.right_child() as usize];

                let mut dist1 = child1.aabb.hit_distance(&ray);
                let mut dist2 = child2.aabb.hit_distance(&ray);

                let mut near = child1;
                let mut far = child2;
                if dist2 < dist1 {
                    (dist1, dist2) = (dist2, dist1);
                    (near, far) = (far, near);
                }

                if dist1.is_infinite() {
                    if stack_ptr == 0 {
                        break;
                    }
                    stack_ptr -= 1;
                    node = stack[stack_ptr].unwrap();
                } else {
                    node = near;
                    if dist2.is_finite() {
                        stack[stack_ptr] = Some(far);
                        stack_ptr += 1;
                    }
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{prelude::SliceRandom, thread_rng, Rng};

    use approx::*;

    use crate::{Intersection, Primitive, Triangle};

    static TRIANGLES_NUM: usize = 64;

    fn gen_vec(rng: &mut impl Rng, scale: f32, offset: f32) -> Vec3A {
        Vec3A::new(
            rng.gen::<f32>() * scale + offset,
            rng.gen::<f32>() * scale + offset,
            rng.gen::<f32>() * scale + offset,
        )
    }

    fn random_soup(rng: &mut impl Rng, triangles: usize) -> Mesh {
        let mut positions = Vec::with_capacity(triangles * 3);
        let mut indices = Vec::with_capacity(triangles);
        for i in 0..triangles {
            let v0 = gen_vec(rng, 9.0, -5.0);
            positions.push(v0);
            positions.push(v0 + gen_vec(rng, 1.0, 0.1));
            positions.push(v0 + Vec3A::new(-rng.gen::<f32>() - 0.1, rng.gen::<f32>() + 0.1, rng.gen::<f32>()));
            let base = (i * 3) as u32;
            indices.push(Triangle::new(base, base + 1, base + 2));
        }
        Mesh::new(vec![Primitive::new(positions, None, indices)])
    }

    fn proxies_of(meshes: &[Mesh]) -> Vec<TriangleProxy> {
        let mut proxies = Vec::new();
        for (imesh, mesh) in meshes.iter().enumerate() {
            for iprim in 0..mesh.num_primitives() {
                mesh.primitive(iprim)
                    .append_proxies(imesh as u32, iprim as u32, &mut proxies);
            }
        }
        proxies
    }

    #[test]
    fn empty_no_intersect() {
        let ray = Ray::infinite(Vec3A::ZERO, Vec3A::X);

        let mut bvh = BinnedBvh::default();
        bvh.init(Arc::new(RwLock::new(vec![])));
        bvh.build(&[]);

        assert!(bvh.intersect(&ray).is_none());
    }

    #[test]
    fn single_triangle_hit() {
        let meshes = Arc::new(RwLock::new(vec![Mesh::new(vec![Primitive::new(
            vec![
                Vec3A::new(-1.0, -1.0, 3.0),
                Vec3A::new(1.0, -1.0, 3.0),
                Vec3A::new(0.0, 1.0, 3.0),
            ],
            None,
            vec![Triangle::new(0, 1, 2)],
        )])]));

        let mut bvh = BinnedBvh::default();
        bvh.init(meshes.clone());
        let proxies = proxies_of(&meshes.read());
        bvh.build(&proxies);

        let ray = Ray::infinite(Vec3A::ZERO, Vec3A::Z);
        let hit = bvh.intersect(&ray).unwrap();
        assert!(hit.result.is_hit());
        assert_abs_diff_eq!(hit.t, 3.0, epsilon = 1.0e-5);
        assert_eq!(hit.proxy, TriangleProxy::new(0, 0, 0));

        let away = Ray::infinite(Vec3A::ZERO, -Vec3A::Z);
        assert!(bvh.intersect(&away).is_none());
    }

    #[test]
    fn matches_brute_force() {
        let mut rng = thread_rng();
        let meshes = Arc::new(RwLock::new(vec![random_soup(&mut rng, TRIANGLES_NUM)]));

        let mut bvh = BinnedBvh::default();
        bvh.init(meshes.clone());
        let proxies = proxies_of(&meshes.read());
        bvh.build(&proxies);

        let meshes_ref = meshes.read();
        for _ in 0..16 {
            let proxy = proxies.choose(&mut rng).unwrap();
            let target = proxy.centroid(&meshes_ref);
            let ray = Ray::infinite(Vec3A::ZERO, target);

            let hit = bvh.intersect(&ray);

            let mut brute_intersection = Intersection::default();
            let mut brute_ray = ray;
            meshes_ref[0].test(&mut brute_intersection, &mut brute_ray);

            match hit {
                Some(hit) => {
                    assert!(brute_intersection.is_hit());
                    assert_abs_diff_eq!(hit.t, brute_intersection.t, epsilon = 1.0e-4);
                }
                None => assert!(!brute_intersection.is_hit()),
            }
        }
    }
}
