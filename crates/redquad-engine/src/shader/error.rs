use std::fmt;
use std::io;
use std::path::PathBuf;

/// Pipeline stage a shader source belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Vertex => f.write_str("vertex"),
            Stage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Failure to compile, link or query a shader program.
///
/// This is the only error kind the scene layer can produce. Callers treat it
/// as fatal at startup.
#[derive(Debug)]
pub enum ShaderError {
    /// A shader file could not be read.
    Io { path: PathBuf, source: io::Error },

    /// WGSL syntax error. `line`/`col` are 1-based; 0 when unknown.
    Parse { stage: Stage, file: String, line: u32, col: u32, message: String },

    /// The module parsed but failed semantic validation.
    Validation { stage: Stage, file: String, message: String },

    /// The stage does not expose exactly one entry point of its kind.
    EntryPoint { stage: Stage, file: String, found: usize },

    /// The module uses something this program model cannot express.
    Unsupported { stage: Stage, file: String, message: String },

    /// The two stages do not fit together.
    Link { message: String },

    /// No attribute with this name exists on the vertex stage.
    MissingAttribute(String),

    /// No uniform with this name exists on either stage.
    MissingUniform(String),

    /// The named slot exists but has a different type than requested.
    TypeMismatch { name: String, expected: String, found: String },
}

impl ShaderError {
    pub(crate) fn link(msg: impl Into<String>) -> Self {
        ShaderError::Link { message: msg.into() }
    }
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::Io { path, source } => {
                write!(f, "failed to read shader {}: {source}", path.display())
            }
            ShaderError::Parse { stage, file, line, col, message } => {
                write!(f, "{stage} shader {file}:{line}:{col}: {message}")
            }
            ShaderError::Validation { stage, file, message } => {
                write!(f, "{stage} shader {file} failed validation: {message}")
            }
            ShaderError::EntryPoint { stage, file, found } => {
                write!(
                    f,
                    "{stage} shader {file} must declare exactly one @{stage} entry point, \
                     found {found}"
                )
            }
            ShaderError::Unsupported { stage, file, message } => {
                write!(f, "{stage} shader {file}: unsupported: {message}")
            }
            ShaderError::Link { message } => write!(f, "shader link error: {message}"),
            ShaderError::MissingAttribute(name) => write!(f, "no attribute named `{name}`"),
            ShaderError::MissingUniform(name) => write!(f, "no uniform named `{name}`"),
            ShaderError::TypeMismatch { name, expected, found } => {
                write!(f, "`{name}` has type {found}, expected {expected}")
            }
        }
    }
}

impl std::error::Error for ShaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShaderError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
