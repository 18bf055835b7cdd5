use redquad_engine::coords::{Vec3, Vec4};
use redquad_engine::render::{GraphicsDevice, Topology, UniformValue, VertexBuffer};
use redquad_engine::shader::{
    AttributeSlot, Shader, ShaderError, ShaderLibrary, UniformKind, UniformSlot,
};

/// Shader files, looked up in the library's directory.
pub const VERTEX_SHADER: &str = "vertex.wgsl";
pub const FRAGMENT_SHADER: &str = "fragment.wgsl";

/// A square covering the whole viewport: two counter-clockwise triangles
/// sharing the (-1,-1)–(1,1) diagonal.
#[rustfmt::skip]
pub const QUAD_VERTICES: [Vec4; 6] = [
    Vec4::new( 1.0,  1.0, 0.0, 1.0),
    Vec4::new(-1.0,  1.0, 0.0, 1.0),
    Vec4::new(-1.0, -1.0, 0.0, 1.0),

    Vec4::new(-1.0, -1.0, 0.0, 1.0),
    Vec4::new( 1.0, -1.0, 0.0, 1.0),
    Vec4::new( 1.0,  1.0, 0.0, 1.0),
];

/// Red.
pub const QUAD_COLOUR: Vec3 = Vec3::new(1.0, 0.0, 0.0);

/// One mesh, one shader, one draw call.
pub struct Scene<D: GraphicsDevice> {
    shader: Shader<D>,
    vertex_buffer: VertexBuffer<D>,
    a_position: AttributeSlot,
    u_colour: UniformSlot,
}

impl<D: GraphicsDevice> Scene<D> {
    /// Compiles the shader and uploads the quad. Nothing is uploaded if the
    /// shader fails to compile or lacks `a_position`/`u_colour`.
    pub fn new(gl: &mut D, shaders: &ShaderLibrary) -> Result<Self, ShaderError> {
        let shader = shaders.compile_shader(gl, VERTEX_SHADER, FRAGMENT_SHADER)?;
        let a_position = shader.attribute("a_position", VertexBuffer::<D>::FORMAT)?;
        let u_colour = shader.uniform("u_colour", UniformKind::Vec3)?;

        let vertex_buffer = VertexBuffer::new(gl, "quad", &QUAD_VERTICES);

        Ok(Self {
            shader,
            vertex_buffer,
            a_position,
            u_colour,
        })
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_buffer.len()
    }

    pub fn triangle_count(&self) -> u32 {
        self.vertex_buffer.len() / 3
    }

    pub fn vertex_buffer(&self) -> &VertexBuffer<D> {
        &self.vertex_buffer
    }

    pub fn shader(&self) -> &Shader<D> {
        &self.shader
    }

    pub fn draw(&self, gl: &mut D) {
        self.shader.enable(gl);
        self.shader.set_attribute(gl, &self.a_position, &self.vertex_buffer);
        self.shader.set_uniform(gl, &self.u_colour, UniformValue::Vec3(QUAD_COLOUR));
        gl.draw_arrays(Topology::TriangleList, 0, self.vertex_buffer.len());
    }
}
