use bytemuck::{Pod, Zeroable};

/// Vertex index triple into the owning primitive's vertex arrays
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Triangle {
    pub indices: [u32; 3],
}

impl Triangle {
    #[inline]
    pub fn new(i0: u32, i1: u32, i2: u32) -> Self {
        Self {
            indices: [i0, i1, i2],
        }
    }
}
