//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, wires them to the GPU layer and
//! drives a `WindowListener`.

mod runtime;

pub use runtime::{Runtime, WindowConfig};
