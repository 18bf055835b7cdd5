//! redquad engine crate.
//!
//! Window runtime, wgpu device, a GL-style command interface and a WGSL
//! shader library. The application supplies a `WindowListener` and never
//! touches winit or wgpu directly.

pub mod coords;
pub mod core;
pub mod device;
pub mod logging;
pub mod render;
pub mod shader;
pub mod window;
