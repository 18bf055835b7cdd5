use crate::render::{GraphicsDevice, UniformValue, VertexBuffer};

use super::{AttributeFormat, ProgramInterface, ShaderError, UniformKind};

/// Resolved, type-checked attribute of a program.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AttributeSlot {
    /// `@location` in the vertex stage.
    pub location: u32,
    /// Vertex buffer slot feeding the attribute.
    pub slot: u32,
    pub format: AttributeFormat,
}

/// Resolved, type-checked uniform of a program.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UniformSlot {
    pub binding: u32,
    pub kind: UniformKind,
}

/// A linked program plus its interface.
///
/// Attributes and uniforms are looked up by name once (`attribute`,
/// `uniform`); the returned slots are then used every frame.
pub struct Shader<D: GraphicsDevice> {
    label: String,
    program: D::Program,
    interface: ProgramInterface,
}

impl<D: GraphicsDevice> Shader<D> {
    pub(crate) fn new(label: String, program: D::Program, interface: ProgramInterface) -> Self {
        Self { label, program, interface }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn interface(&self) -> &ProgramInterface {
        &self.interface
    }

    pub fn program(&self) -> &D::Program {
        &self.program
    }

    /// Resolves the attribute `name`, which must have type `format`.
    pub fn attribute(
        &self,
        name: &str,
        format: AttributeFormat,
    ) -> Result<AttributeSlot, ShaderError> {
        let (slot, info) = self
            .interface
            .attribute(name)
            .ok_or_else(|| ShaderError::MissingAttribute(name.to_string()))?;

        if info.format != format {
            return Err(ShaderError::TypeMismatch {
                name: name.to_string(),
                expected: format.to_string(),
                found: info.format.to_string(),
            });
        }

        Ok(AttributeSlot {
            location: info.location,
            slot,
            format,
        })
    }

    /// Resolves the uniform `name`, which must have type `kind`.
    pub fn uniform(&self, name: &str, kind: UniformKind) -> Result<UniformSlot, ShaderError> {
        let info = self
            .interface
            .uniform(name)
            .ok_or_else(|| ShaderError::MissingUniform(name.to_string()))?;

        if info.kind != kind {
            return Err(ShaderError::TypeMismatch {
                name: name.to_string(),
                expected: kind.to_string(),
                found: info.kind.to_string(),
            });
        }

        Ok(UniformSlot {
            binding: info.binding,
            kind,
        })
    }

    /// Makes this program current.
    pub fn enable(&self, gl: &mut D) {
        gl.use_program(&self.program);
    }

    /// Feeds `attribute` from `buffer`.
    pub fn set_attribute(&self, gl: &mut D, attribute: &AttributeSlot, buffer: &VertexBuffer<D>) {
        gl.bind_vertex_buffer(attribute, buffer.handle());
    }

    /// Writes `value` into `uniform`. The program must be current.
    pub fn set_uniform(&self, gl: &mut D, uniform: &UniformSlot, value: UniformValue) {
        if value.kind() != uniform.kind {
            log::error!(
                "`{}`: uniform at @binding({}) is {}, got a {} value; ignored",
                self.label,
                uniform.binding,
                uniform.kind,
                value.kind()
            );
            return;
        }
        gl.set_uniform(uniform, value);
    }
}
