use crate::coords::{ColorRgba, Vec3, Vec4, Viewport};
use crate::shader::{AttributeSlot, ProgramInterface, ShaderError, UniformKind, UniformSlot};

/// Primitive assembly mode for `draw_arrays`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Topology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

impl Topology {
    pub fn to_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            Topology::PointList => wgpu::PrimitiveTopology::PointList,
            Topology::LineList => wgpu::PrimitiveTopology::LineList,
            Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }
}

/// Value written to a uniform slot.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3(Vec3),
    Vec4(Vec4),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
        }
    }

    /// Tightly packed little-endian bytes, as WGSL lays the value out.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            UniformValue::Float(v) => bytemuck::bytes_of(v),
            UniformValue::Vec2(v) => bytemuck::bytes_of(v),
            UniformValue::Vec3(v) => bytemuck::bytes_of(v),
            UniformValue::Vec4(v) => bytemuck::bytes_of(v),
        }
    }
}

/// Sources plus the reflected interface of a program that passed linking.
pub struct ProgramSource<'a> {
    pub label: &'a str,
    pub vertex: &'a str,
    pub fragment: &'a str,
    pub interface: &'a ProgramInterface,
}

/// GL-style command interface used by scene code.
///
/// Only `create_program` can fail. Every other call is infallible from the
/// caller's point of view; misuse (drawing without a program, unbound
/// attributes) is logged and the call is dropped.
pub trait GraphicsDevice {
    type Program;
    type Buffer;

    fn create_program(&mut self, source: &ProgramSource<'_>) -> Result<Self::Program, ShaderError>;

    /// Uploads `vertices` to an immutable vertex buffer.
    fn create_vertex_buffer(&mut self, label: &str, vertices: &[Vec4]) -> Self::Buffer;

    fn set_clear_color(&mut self, color: ColorRgba);

    /// Clears the colour buffer to the current clear colour.
    fn clear(&mut self);

    /// Persistent; applies to every later draw until changed.
    fn set_viewport(&mut self, viewport: Viewport);

    fn use_program(&mut self, program: &Self::Program);

    fn bind_vertex_buffer(&mut self, attribute: &AttributeSlot, buffer: &Self::Buffer);

    /// Writes a uniform of the current program.
    fn set_uniform(&mut self, uniform: &UniformSlot, value: UniformValue);

    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_bytes_match_kind_size() {
        let values = [
            UniformValue::Float(1.0),
            UniformValue::Vec2([1.0, 2.0]),
            UniformValue::Vec3(Vec3::new(1.0, 0.0, 0.0)),
            UniformValue::Vec4(Vec4::new(1.0, 2.0, 3.0, 4.0)),
        ];
        for v in values {
            assert_eq!(v.as_bytes().len() as u64, v.kind().size());
        }
    }

    #[test]
    fn vec3_uniform_is_rgb_order() {
        let red = UniformValue::Vec3(Vec3::new(1.0, 0.0, 0.0));
        let floats: &[f32] = bytemuck::cast_slice(red.as_bytes());
        assert_eq!(floats, &[1.0, 0.0, 0.0]);
    }
}
