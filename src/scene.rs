use std::sync::Arc;

use log::trace;

use parking_lot::RwLock;

use crate::{BinnedBvh, Intersection, Mesh, Node, Ray, TestResult, TriangleProxy};

/// Owns the source meshes, the node hierarchy, the per-frame world-space
/// mesh copies, the triangle-proxy buffer and the accelerator built over
/// it.
///
/// [`Scene::update_frame`] must run to completion before any
/// [`Scene::test`] call of that frame: it resolves world matrices, refines
/// the meshes, regenerates the proxies and rebuilds the accelerator.
/// Queries are read-only afterwards, so independent scenes (and queries
/// against one scene) can run on separate threads, while `update_frame`
/// requires exclusive access.
pub struct Scene {
    name: String,
    meshes: Vec<Mesh>,
    refined_meshes: Arc<RwLock<Vec<Mesh>>>,
    nodes: Vec<Node>,
    triangle_proxies: Vec<TriangleProxy>,
    accelerator: BinnedBvh,
}

impl Scene {
    /// `nodes` must be in parent-before-child order and reference existing
    /// meshes; the external loader guarantees both.
    pub fn new(name: impl Into<String>, meshes: Vec<Mesh>, nodes: Vec<Node>) -> Self {
        debug_assert!(nodes
            .iter()
            .enumerate()
            .all(|(i, node)| node.parent().map_or(true, |p| (p as usize) < i)));
        debug_assert!(nodes
            .iter()
            .all(|node| node.mesh().map_or(true, |m| (m as usize) < meshes.len())));

        let refined_meshes = Arc::new(RwLock::new(Vec::new()));
        let mut accelerator = BinnedBvh::default();
        accelerator.init(refined_meshes.clone());

        Self {
            name: name.into(),
            meshes,
            refined_meshes,
            nodes,
            triangle_proxies: Vec::new(),
            accelerator,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Mutable node access, for animating local matrices between frames
    #[inline]
    pub fn node_mut(&mut self, index: usize) -> &mut Node {
        &mut self.nodes[index]
    }

    #[inline]
    pub fn num_meshes(&self) -> usize {
        self.meshes.len()
    }

    /// Resolve world matrices, refine every referenced mesh into its
    /// world-space copy, regenerate the proxy buffer and rebuild the
    /// accelerator. Call once per frame before querying.
    ///
    /// When several nodes reference the same mesh index, one of their
    /// refined copies survives the pass; which one is unspecified, so
    /// callers must not rely on a particular winner.
    pub fn update_frame(&mut self) {
        {
            let mut refined = self.refined_meshes.write();
            refined.resize_with(self.meshes.len(), Mesh::default);

            // parent-before-child order makes this a single forward pass
            for inode in 0..self.nodes.len() {
                let world = match self.nodes[inode].parent() {
                    None => *self.nodes[inode].local_matrix(),
                    Some(parent) => {
                        debug_assert!((parent as usize) < inode);
                        *self.nodes[parent as usize].world_matrix()
                            * *self.nodes[inode].local_matrix()
                    }
                };
                self.nodes[inode].set_world_matrix(world);

                if let Some(imesh) = self.nodes[inode].mesh() {
                    let imesh = imesh as usize;
                    refined[imesh].refine(&self.meshes[imesh], &world);
                }
            }

            self.triangle_proxies.clear();
            for (imesh, mesh) in refined.iter().enumerate() {
                for iprim in 0..mesh.num_primitives() {
                    mesh.primitive(iprim).append_proxies(
                        imesh as u32,
                        iprim as u32,
                        &mut self.triangle_proxies,
                    );
                }
            }
        }

        trace!(
            "frame update '{}': {} proxies",
            self.name,
            self.triangle_proxies.len()
        );
        self.accelerator.build(&self.triangle_proxies);
    }

    /// Query the accelerator and reconstruct the full intersection record
    /// from the winning proxy. On a hit the ray extent shrinks to the hit
    /// distance.
    pub fn test(&self, intersection: &mut Intersection, ray: &mut Ray) -> TestResult {
        let Some(hit) = self.accelerator.intersect(ray) else {
            return intersection.result;
        };

        ray.t = hit.t;
        intersection.result = hit.result;
        intersection.t = hit.t;
        intersection.b0 = 1.0 - hit.v - hit.w;
        intersection.b1 = hit.v;
        intersection.b2 = hit.w;
        intersection.point = ray.origin + ray.direction * hit.t;

        let meshes = self.refined_meshes.read();
        let primitive =
            meshes[hit.proxy.mesh as usize].primitive(hit.proxy.primitive as usize);
        let (p0, p1, p2) = primitive.triangle_vertices(hit.proxy.triangle as usize);
        intersection.geometric_normal = (p1 - p0).cross(p2 - p0).normalize_or_zero();
        intersection.shading_normal = if primitive.has_normals() {
            let tri = primitive.triangle(hit.proxy.triangle as usize);
            primitive.normal(tri.indices[0] as usize) * intersection.b0
                + primitive.normal(tri.indices[1] as usize) * intersection.b1
                + primitive.normal(tri.indices[2] as usize) * intersection.b2
        } else {
            intersection.geometric_normal
        };

        intersection.result
    }
}
