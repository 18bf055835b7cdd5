use std::path::PathBuf;

use anyhow::Context;
use redquad_engine::coords::{ColorRgba, Viewport};
use redquad_engine::core::WindowListener;
use redquad_engine::render::GraphicsDevice;
use redquad_engine::shader::ShaderLibrary;
use redquad_engine::window::WindowConfig;

use crate::scene::Scene;

/// Startup parameters.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub window: WindowConfig,
    /// Directory holding `vertex.wgsl` and `fragment.wgsl`.
    pub shader_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::new("Red Quad", 800, 800).resizable(true),
            shader_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders")),
        }
    }
}

enum Lifecycle<D: GraphicsDevice> {
    Uninitialized,
    Ready(Scene<D>),
    Terminated,
}

/// Application controller: builds the scene on `init` and draws it every
/// frame on a black background.
pub struct App<D: GraphicsDevice> {
    shader_dir: PathBuf,
    screen_width: u32,
    screen_height: u32,
    state: Lifecycle<D>,
}

impl<D: GraphicsDevice> App<D> {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            shader_dir: config.shader_dir.clone(),
            screen_width: config.window.width,
            screen_height: config.window.height,
            state: Lifecycle::Uninitialized,
        }
    }

    /// Framebuffer size in physical pixels, as last reported by `resize`.
    ///
    /// Before the first `resize` this is the configured logical window size.
    /// The runtime reports the physical size right after `init`, so the two
    /// units never mix once the app is running.
    pub fn screen_size(&self) -> (u32, u32) {
        (self.screen_width, self.screen_height)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, Lifecycle::Ready(_))
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.state, Lifecycle::Terminated)
    }

    pub fn scene(&self) -> Option<&Scene<D>> {
        match &self.state {
            Lifecycle::Ready(scene) => Some(scene),
            _ => None,
        }
    }
}

impl<D: GraphicsDevice> WindowListener<D> for App<D> {
    fn init(&mut self, gl: &mut D) -> anyhow::Result<()> {
        if !matches!(self.state, Lifecycle::Uninitialized) {
            log::warn!("init called twice; ignored");
            return Ok(());
        }

        let shaders = ShaderLibrary::new(&self.shader_dir);
        let scene = Scene::new(gl, &shaders)
            .with_context(|| format!("failed to build scene from {}", shaders.dir().display()))?;

        log::info!(
            "scene ready: {} vertices, {} triangles",
            scene.vertex_count(),
            scene.triangle_count()
        );
        self.state = Lifecycle::Ready(scene);
        Ok(())
    }

    fn draw(&mut self, gl: &mut D) {
        let Lifecycle::Ready(scene) = &self.state else {
            log::warn!("draw before init or after close; ignored");
            return;
        };

        gl.set_clear_color(ColorRgba::black());
        gl.clear();

        scene.draw(gl);
    }

    fn resize(&mut self, gl: &mut D, width: u32, height: u32) {
        self.screen_width = width;
        self.screen_height = height;
        gl.set_viewport(Viewport::full(width, height));
    }

    fn close(&mut self) {
        self.state = Lifecycle::Terminated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redquad_engine::render::{Command, RecordingDevice};

    fn app() -> App<RecordingDevice> {
        App::new(&AppConfig::default())
    }

    fn ready_app(gl: &mut RecordingDevice) -> App<RecordingDevice> {
        let mut app = app();
        app.init(gl).unwrap();
        gl.take_commands();
        app
    }

    #[test]
    fn default_config_is_800_square_and_resizable() {
        let config = AppConfig::default();
        assert_eq!((config.window.width, config.window.height), (800, 800));
        assert!(config.window.resizable);
        assert!(config.shader_dir.ends_with("shaders"));
    }

    #[test]
    fn init_moves_to_ready() {
        let mut gl = RecordingDevice::new();
        let mut app = app();
        assert!(!app.is_ready());

        app.init(&mut gl).unwrap();
        assert!(app.is_ready());
        assert_eq!(app.scene().map(|s| s.vertex_count()), Some(6));
    }

    #[test]
    fn failed_init_never_becomes_ready() {
        let mut gl = RecordingDevice::new();
        let config = AppConfig {
            shader_dir: PathBuf::from("/nonexistent/redquad"),
            ..AppConfig::default()
        };
        let mut app = App::new(&config);

        let err = app.init(&mut gl).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read shader"));
        assert!(!app.is_ready());
        assert!(app.scene().is_none());
    }

    #[test]
    fn draw_clears_to_black_then_draws_scene() {
        let mut gl = RecordingDevice::new();
        let mut app = ready_app(&mut gl);

        app.draw(&mut gl);
        let cmds = gl.take_commands();

        assert_eq!(cmds[0], Command::SetClearColor(ColorRgba::new(0.0, 0.0, 0.0, 1.0)));
        assert_eq!(cmds[1], Command::Clear);
        assert!(matches!(cmds[2], Command::UseProgram(_)));
        assert!(matches!(cmds.last(), Some(Command::DrawArrays { count: 6, .. })));
    }

    #[test]
    fn draw_before_init_does_nothing() {
        let mut gl = RecordingDevice::new();
        let mut app = app();
        app.draw(&mut gl);
        assert!(gl.commands().is_empty());
    }

    #[test]
    fn frames_are_identical() {
        let mut gl = RecordingDevice::new();
        let mut app = ready_app(&mut gl);

        app.draw(&mut gl);
        let first = gl.take_commands();
        app.draw(&mut gl);
        assert_eq!(gl.take_commands(), first);
    }

    #[test]
    fn resize_is_last_write_wins() {
        let mut gl = RecordingDevice::new();
        let mut app = ready_app(&mut gl);

        for (w, h) in [(640, 480), (1, 1000), (1920, 1080), (300, 300)] {
            app.resize(&mut gl, w, h);
            assert_eq!(app.screen_size(), (w, h));
            assert_eq!(gl.viewport(), Some(Viewport::new(0, 0, w, h)));
        }
    }

    #[test]
    fn startup_size_is_replaced_by_physical_size() {
        let mut gl = RecordingDevice::new();
        let mut app = app();
        assert_eq!(app.screen_size(), (800, 800));

        // HiDPI at scale factor 2: init, then the runtime's initial resize.
        app.init(&mut gl).unwrap();
        app.resize(&mut gl, 1600, 1600);

        assert_eq!(app.screen_size(), (1600, 1600));
        assert_eq!(gl.viewport(), Some(Viewport::full(1600, 1600)));
    }

    #[test]
    fn non_square_resize_is_not_corrected() {
        let mut gl = RecordingDevice::new();
        let mut app = ready_app(&mut gl);

        app.resize(&mut gl, 1000, 10);
        assert_eq!(app.screen_size(), (1000, 10));
        assert_eq!(gl.take_commands(), vec![Command::SetViewport(Viewport::full(1000, 10))]);
    }

    #[test]
    fn full_lifecycle() {
        let mut gl = RecordingDevice::new();
        let mut app = app();

        app.init(&mut gl).unwrap();
        app.draw(&mut gl);
        app.resize(&mut gl, 1024, 768);
        app.draw(&mut gl);
        app.close();

        assert!(app.is_terminated());
        assert_eq!(gl.viewport(), Some(Viewport::new(0, 0, 1024, 768)));

        let draws = gl
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::DrawArrays { .. }))
            .count();
        assert_eq!(draws, 2);
    }

    #[test]
    fn draw_after_close_does_nothing() {
        let mut gl = RecordingDevice::new();
        let mut app = ready_app(&mut gl);
        app.close();
        app.draw(&mut gl);
        assert!(gl.commands().is_empty());
    }
}
