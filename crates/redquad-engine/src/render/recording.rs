use crate::coords::{ColorRgba, Vec4, Viewport};
use crate::shader::{AttributeSlot, ProgramInterface, ShaderError, UniformSlot};

use super::{GraphicsDevice, ProgramSource, Topology, UniformValue};

/// Program handle issued by `RecordingDevice`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramId(pub u32);

/// Buffer handle issued by `RecordingDevice`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferId(pub u32);

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetClearColor(ColorRgba),
    Clear,
    SetViewport(Viewport),
    UseProgram(ProgramId),
    BindVertexBuffer { location: u32, buffer: BufferId },
    SetUniform { binding: u32, value: UniformValue },
    DrawArrays { topology: Topology, first: u32, count: u32 },
}

/// Headless device that records calls instead of executing them.
///
/// Resource creation is tracked so tests can read back what was uploaded.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    commands: Vec<Command>,
    programs: Vec<ProgramInterface>,
    buffers: Vec<Vec<Vec4>>,
    clear_color: ColorRgba,
    viewport: Option<Viewport>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Returns and forgets everything recorded so far.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Last viewport set, if any.
    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn clear_color(&self) -> ColorRgba {
        self.clear_color
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn program_interface(&self, id: ProgramId) -> Option<&ProgramInterface> {
        self.programs.get(id.0 as usize)
    }

    pub fn buffer_contents(&self, id: BufferId) -> Option<&[Vec4]> {
        self.buffers.get(id.0 as usize).map(Vec::as_slice)
    }
}

impl GraphicsDevice for RecordingDevice {
    type Program = ProgramId;
    type Buffer = BufferId;

    fn create_program(&mut self, source: &ProgramSource<'_>) -> Result<ProgramId, ShaderError> {
        let id = ProgramId(self.programs.len() as u32);
        self.programs.push(source.interface.clone());
        Ok(id)
    }

    fn create_vertex_buffer(&mut self, _label: &str, vertices: &[Vec4]) -> BufferId {
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(vertices.to_vec());
        id
    }

    fn set_clear_color(&mut self, color: ColorRgba) {
        self.clear_color = color;
        self.commands.push(Command::SetClearColor(color));
    }

    fn clear(&mut self) {
        self.commands.push(Command::Clear);
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        self.commands.push(Command::SetViewport(viewport));
    }

    fn use_program(&mut self, program: &ProgramId) {
        self.commands.push(Command::UseProgram(*program));
    }

    fn bind_vertex_buffer(&mut self, attribute: &AttributeSlot, buffer: &BufferId) {
        self.commands.push(Command::BindVertexBuffer {
            location: attribute.location,
            buffer: *buffer,
        });
    }

    fn set_uniform(&mut self, uniform: &UniformSlot, value: UniformValue) {
        self.commands.push(Command::SetUniform {
            binding: uniform.binding,
            value,
        });
    }

    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) {
        self.commands.push(Command::DrawArrays { topology, first, count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_round_trip_in_order() {
        let mut gl = RecordingDevice::new();
        let data = [Vec4::point(0.0, 1.0, 0.0), Vec4::point(2.0, 3.0, 0.0)];
        let a = gl.create_vertex_buffer("a", &data);
        let b = gl.create_vertex_buffer("b", &[]);

        assert_eq!(gl.buffer_contents(a), Some(&data[..]));
        assert_eq!(gl.buffer_contents(b), Some(&[][..]));
        assert_ne!(a, b);
        assert_eq!(gl.buffer_count(), 2);
    }

    #[test]
    fn viewport_is_last_write() {
        let mut gl = RecordingDevice::new();
        assert_eq!(gl.viewport(), None);
        gl.set_viewport(Viewport::full(10, 20));
        gl.set_viewport(Viewport::full(30, 40));
        assert_eq!(gl.viewport(), Some(Viewport::full(30, 40)));
        assert_eq!(gl.commands().len(), 2);
    }

    #[test]
    fn take_commands_drains() {
        let mut gl = RecordingDevice::new();
        gl.set_clear_color(ColorRgba::black());
        gl.clear();
        let taken = gl.take_commands();
        assert_eq!(taken, vec![Command::SetClearColor(ColorRgba::black()), Command::Clear]);
        assert!(gl.commands().is_empty());
        assert_eq!(gl.clear_color(), ColorRgba::black());
    }
}
