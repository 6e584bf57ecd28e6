use glam::Mat4;

/// One entry of the flat scene hierarchy. Nodes are stored in
/// parent-before-child order, so a node's parent index is always smaller
/// than its own and a single forward pass resolves every world matrix.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    parent: Option<u32>,
    mesh: Option<u32>,
    local_matrix: Mat4,
    world_matrix: Mat4,
}

impl Default for Node {
    fn default() -> Self {
        Self::new("", None, None, Mat4::IDENTITY)
    }
}

impl Node {
    pub fn new(
        name: impl Into<String>,
        parent: Option<u32>,
        mesh: Option<u32>,
        local_matrix: Mat4,
    ) -> Self {
        Self {
            name: name.into(),
            parent,
            mesh,
            local_matrix,
            world_matrix: Mat4::IDENTITY,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parent(&self) -> Option<u32> {
        self.parent
    }

    #[inline]
    pub fn mesh(&self) -> Option<u32> {
        self.mesh
    }

    #[inline]
    pub fn local_matrix(&self) -> &Mat4 {
        &self.local_matrix
    }

    #[inline]
    pub fn local_matrix_mut(&mut self) -> &mut Mat4 {
        &mut self.local_matrix
    }

    /// World matrix as of the last frame update
    #[inline]
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    #[inline]
    pub(crate) fn set_world_matrix(&mut self, world: Mat4) {
        self.world_matrix = world;
    }
}
