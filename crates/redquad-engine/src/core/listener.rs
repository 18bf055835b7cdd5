use crate::render::GraphicsDevice;

/// Lifecycle hooks driven by the window runtime.
///
/// All hooks run on the event-loop thread, never concurrently. The order is
/// `init` once, then any interleaving of `draw` and `resize`, then `close`
/// once.
pub trait WindowListener<D: GraphicsDevice> {
    /// Creates resources. An error aborts startup before the first frame.
    fn init(&mut self, gl: &mut D) -> anyhow::Result<()>;

    /// Records one frame.
    fn draw(&mut self, gl: &mut D);

    /// Called with the framebuffer size in physical pixels: once right after
    /// a successful `init`, then on every window resize.
    fn resize(&mut self, gl: &mut D, width: u32, height: u32);

    /// The window is about to close. No device is available any more.
    fn close(&mut self);
}
