//! Shader programs.
//!
//! Shaders are WGSL, one file per stage. The library parses and validates
//! both stages with naga, reflects their attributes and uniforms, checks
//! that the stages link, and only then asks the device for a program.

mod error;
mod library;
mod program;
mod reflect;

pub use error::{ShaderError, Stage};
pub use library::ShaderLibrary;
pub use program::{AttributeSlot, Shader, UniformSlot};
pub use reflect::{AttributeFormat, AttributeInfo, ProgramInterface, UniformInfo, UniformKind};
