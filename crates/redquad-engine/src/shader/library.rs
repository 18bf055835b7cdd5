use std::fs;
use std::path::{Path, PathBuf};

use crate::render::{GraphicsDevice, ProgramSource};

use super::reflect::{link, StageModule};
use super::{Shader, ShaderError, Stage};

/// Compiles shader programs from WGSL files in one directory.
#[derive(Debug, Clone)]
pub struct ShaderLibrary {
    dir: PathBuf,
}

impl ShaderLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads `vertex_file` and `fragment_file` from the library directory and
    /// compiles them into one program.
    pub fn compile_shader<D: GraphicsDevice>(
        &self,
        gl: &mut D,
        vertex_file: &str,
        fragment_file: &str,
    ) -> Result<Shader<D>, ShaderError> {
        let vertex = self.read(vertex_file)?;
        let fragment = self.read(fragment_file)?;
        Self::compile_source(gl, vertex_file, &vertex, fragment_file, &fragment)
    }

    /// Compiles a program from in-memory sources. The file names are only
    /// used for labels and error messages.
    pub fn compile_source<D: GraphicsDevice>(
        gl: &mut D,
        vertex_file: &str,
        vertex: &str,
        fragment_file: &str,
        fragment: &str,
    ) -> Result<Shader<D>, ShaderError> {
        let label = format!("{vertex_file} + {fragment_file}");

        let vs = StageModule::compile(Stage::Vertex, vertex_file, vertex)?;
        let fs = StageModule::compile(Stage::Fragment, fragment_file, fragment)?;
        let interface = link(&vs, &fs)?;

        let program = gl.create_program(&ProgramSource {
            label: &label,
            vertex,
            fragment,
            interface: &interface,
        })?;

        log::info!(
            "compiled shader `{label}` ({} attribute(s), {} uniform(s))",
            interface.attributes.len(),
            interface.uniforms.len()
        );
        for a in &interface.attributes {
            log::debug!("  attribute {} @location({}): {}", a.name, a.location, a.format);
        }
        for u in &interface.uniforms {
            log::debug!("  uniform {} @binding({}): {}", u.name, u.binding, u.kind);
        }

        Ok(Shader::new(label, program, interface))
    }

    fn read(&self, file: &str) -> Result<String, ShaderError> {
        let path = self.dir.join(file);
        fs::read_to_string(&path).map_err(|source| ShaderError::Io { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingDevice;
    use crate::shader::{AttributeFormat, UniformKind};

    const VS: &str = "
        @vertex
        fn vs_main(@location(0) a_position: vec4<f32>) -> @builtin(position) vec4<f32> {
            return a_position;
        }
    ";

    const FS: &str = "
        @group(0) @binding(0)
        var<uniform> u_colour: vec3<f32>;

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return vec4<f32>(u_colour, 1.0);
        }
    ";

    #[test]
    fn compiles_and_resolves_slots() {
        let mut gl = RecordingDevice::new();
        let shader = ShaderLibrary::compile_source(&mut gl, "v.wgsl", VS, "f.wgsl", FS).unwrap();

        assert_eq!(gl.program_count(), 1);
        assert_eq!(shader.label(), "v.wgsl + f.wgsl");

        let pos = shader.attribute("a_position", AttributeFormat::Float32x4).unwrap();
        assert_eq!((pos.location, pos.slot), (0, 0));

        let colour = shader.uniform("u_colour", UniformKind::Vec3).unwrap();
        assert_eq!(colour.binding, 0);
    }

    #[test]
    fn unknown_names_are_errors() {
        let mut gl = RecordingDevice::new();
        let shader = ShaderLibrary::compile_source(&mut gl, "v.wgsl", VS, "f.wgsl", FS).unwrap();

        assert!(matches!(
            shader.attribute("a_normal", AttributeFormat::Float32x3),
            Err(ShaderError::MissingAttribute(_))
        ));
        assert!(matches!(
            shader.uniform("u_color", UniformKind::Vec3),
            Err(ShaderError::MissingUniform(_))
        ));
    }

    #[test]
    fn wrong_types_are_errors() {
        let mut gl = RecordingDevice::new();
        let shader = ShaderLibrary::compile_source(&mut gl, "v.wgsl", VS, "f.wgsl", FS).unwrap();

        let err = shader.uniform("u_colour", UniformKind::Vec4).unwrap_err();
        assert_eq!(err.to_string(), "`u_colour` has type vec3<f32>, expected vec4<f32>");
        assert!(shader.attribute("a_position", AttributeFormat::Float32x2).is_err());
    }

    #[test]
    fn failed_compile_creates_no_program() {
        let mut gl = RecordingDevice::new();
        let result = ShaderLibrary::compile_source(&mut gl, "v.wgsl", "not wgsl", "f.wgsl", FS);
        assert!(matches!(result, Err(ShaderError::Parse { stage: Stage::Vertex, .. })));
        assert_eq!(gl.program_count(), 0);
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut gl = RecordingDevice::new();
        let lib = ShaderLibrary::new("/nonexistent/redquad/shaders");
        let err = lib.compile_shader(&mut gl, "vertex.wgsl", "fragment.wgsl").err().unwrap();
        match err {
            ShaderError::Io { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/redquad/shaders/vertex.wgsl"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gl.program_count(), 0);
    }
}
