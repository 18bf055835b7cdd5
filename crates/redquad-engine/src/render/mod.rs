//! Graphics command interface.
//!
//! `GraphicsDevice` is a small GL-style context: programs and buffers are
//! created through it, and frames are described as a sequence of state
//! changes and `draw_arrays` calls. Two implementations exist:
//!
//! - `WgpuDevice` records the calls of one frame and encodes them into
//!   render passes when the runtime presents.
//! - `RecordingDevice` keeps the calls as data, for tests and headless use.

mod buffer;
mod device;
mod recording;
mod wgpu_backend;

pub use buffer::{VertexBuffer, VERTEX_STRIDE};
pub use device::{GraphicsDevice, ProgramSource, Topology, UniformValue};
pub use recording::{BufferId, Command, ProgramId, RecordingDevice};
pub use wgpu_backend::{WgpuBuffer, WgpuDevice, WgpuProgram};
