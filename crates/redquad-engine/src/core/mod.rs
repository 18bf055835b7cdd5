//! Contract between the window runtime and the application.
//!
//! The runtime owns the platform loop and the GPU; the application only sees
//! four lifecycle hooks and a `GraphicsDevice` to issue commands on.

mod listener;

pub use listener::WindowListener;
