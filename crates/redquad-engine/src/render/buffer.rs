use crate::coords::Vec4;
use crate::shader::AttributeFormat;

use super::GraphicsDevice;

/// Byte stride between consecutive vertices in a `VertexBuffer`.
pub const VERTEX_STRIDE: u64 = std::mem::size_of::<Vec4>() as u64;

/// Static buffer of homogeneous positions, uploaded once.
pub struct VertexBuffer<D: GraphicsDevice> {
    handle: D::Buffer,
    vertex_count: u32,
}

impl<D: GraphicsDevice> VertexBuffer<D> {
    /// Attribute format a buffer of `Vec4` feeds.
    pub const FORMAT: AttributeFormat = AttributeFormat::Float32x4;

    pub fn new(gl: &mut D, label: &str, vertices: &[Vec4]) -> Self {
        let handle = gl.create_vertex_buffer(label, vertices);
        log::debug!("uploaded vertex buffer `{label}` ({} vertices)", vertices.len());
        Self {
            handle,
            vertex_count: vertices.len() as u32,
        }
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.vertex_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }

    #[inline]
    pub fn handle(&self) -> &D::Buffer {
        &self.handle
    }
}
