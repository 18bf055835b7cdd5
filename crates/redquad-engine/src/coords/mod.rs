//! Small math and geometry types shared by the shader library and the
//! graphics devices.
//!
//! Vertex data is homogeneous clip-space (`Vec4`, `w = 1`). Viewports are
//! framebuffer pixels with a bottom-left origin, the way a GL viewport is
//! specified; the wgpu backend flips them when encoding.

mod color;
mod vec;
mod viewport;

pub use color::ColorRgba;
pub use vec::{Vec3, Vec4};
pub use viewport::Viewport;
