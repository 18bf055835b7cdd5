//! Opens an 800x800 window and draws a red square on black.
//!
//! Set `RUST_LOG=debug` to see shader reflection and resize events.

mod app;
mod scene;

use redquad_engine::device::GpuInit;
use redquad_engine::logging::{init_logging, LoggingConfig};
use redquad_engine::render::WgpuDevice;
use redquad_engine::window::Runtime;

use crate::app::{App, AppConfig};

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let config = AppConfig::default();
    log::info!(
        "starting `{}` ({}x{}), shaders in {}",
        config.window.title,
        config.window.width,
        config.window.height,
        config.shader_dir.display()
    );

    let app: App<WgpuDevice> = App::new(&config);
    Runtime::run(config.window, GpuInit::default(), app)
}
