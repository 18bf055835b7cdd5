use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::WindowListener;
use crate::device::{Gpu, GpuInit, SurfaceErrorAction};
use crate::render::WgpuDevice;

/// Window configuration. Read once at startup; resizes do not change it.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    /// Initial width in logical pixels.
    pub width: u32,
    /// Initial height in logical pixels.
    pub height: u32,
    pub resizable: bool,
}

impl WindowConfig {
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            resizable: true,
        }
    }

    pub fn resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new("redquad", 800, 800)
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window and runs `listener` until the window closes.
    ///
    /// Returns the error that stopped the loop, if any: a failed `init`, a
    /// window/GPU creation failure or a fatal surface error.
    pub fn run<L>(config: WindowConfig, gpu_init: GpuInit, listener: L) -> Result<()>
    where
        L: WindowListener<WgpuDevice>,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, listener);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct Active {
    entry: WindowEntry,
    device: WgpuDevice,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Phase {
    Starting,
    Running,
    Closed,
}

struct AppState<L> {
    config: WindowConfig,
    gpu_init: GpuInit,
    listener: L,

    active: Option<Active>,
    phase: Phase,
    failure: Option<anyhow::Error>,
}

impl<L> AppState<L>
where
    L: WindowListener<WgpuDevice>,
{
    fn new(config: WindowConfig, gpu_init: GpuInit, listener: L) -> Self {
        Self {
            config,
            gpu_init,
            listener,
            active: None,
            phase: Phase::Starting,
            failure: None,
        }
    }

    fn open(&self, event_loop: &ActiveEventLoop) -> Result<Active> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height))
            .with_resizable(self.config.resizable);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let entry = WindowEntryTryBuilder {
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed for window")?;

        let device = entry.with_gpu(|gpu| WgpuDevice::new(gpu));
        Ok(Active { entry, device })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.failure = Some(err);
        self.active = None;
        self.phase = Phase::Closed;
        event_loop.exit();
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        if self.phase == Phase::Running {
            log::info!("window closed");
            self.listener.close();
        }
        self.phase = Phase::Closed;
        self.active = None;
        event_loop.exit();
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let Some(active) = self.active.as_mut() else { return };

        active.entry.with_gpu_mut(|gpu| gpu.resize(size));
        log::debug!("resized to {}x{}", size.width, size.height);

        self.listener.resize(&mut active.device, size.width, size.height);
        active.entry.with_window(|w| w.request_redraw());
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(active) = self.active.as_mut() else { return };

        // Minimized: nothing to present into.
        if !active.entry.with_gpu(|gpu| gpu.is_renderable()) {
            return;
        }

        self.listener.draw(&mut active.device);

        let Active { entry, device } = active;
        let outcome = entry.with_mut(|fields| -> Result<()> {
            let mut frame = match fields.gpu.begin_frame() {
                Ok(f) => f,
                Err(err) => {
                    device.discard_pending();
                    let msg = err.to_string();
                    return match fields.gpu.handle_surface_error(err) {
                        SurfaceErrorAction::Fatal => Err(anyhow!("surface error: {msg}")),
                        action => {
                            log::debug!("frame dropped ({msg}): {action:?}");
                            Ok(())
                        }
                    };
                }
            };

            let texture = &frame.surface_texture.texture;
            let target = PhysicalSize::new(texture.width(), texture.height());
            device.encode(&mut frame.encoder, &frame.view, target);

            fields.window.pre_present_notify();
            fields.gpu.submit(frame);
            Ok(())
        });

        if let Err(e) = outcome {
            self.fail(event_loop, e);
        }
    }
}

impl<L> ApplicationHandler for AppState<L>
where
    L: WindowListener<WgpuDevice>,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.phase != Phase::Starting || self.active.is_some() {
            return;
        }

        let mut active = match self.open(event_loop) {
            Ok(a) => a,
            Err(e) => {
                self.fail(event_loop, e);
                return;
            }
        };

        if let Err(e) = self.listener.init(&mut active.device) {
            self.fail(event_loop, e.context("application init failed"));
            return;
        }

        // Report the real drawable size; on HiDPI it differs from the logical config.
        let size = active.entry.with_gpu(|gpu| gpu.size());
        self.listener.resize(&mut active.device, size.width, size.height);

        active.entry.with_window(|w| w.request_redraw());
        self.active = Some(active);
        self.phase = Phase::Running;
        log::info!("window `{}` ready", self.config.title);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw.
        if let Some(active) = &self.active {
            active.entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.phase != Phase::Running {
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.close(event_loop),

            WindowEvent::Resized(new_size) => self.resize(new_size),

            WindowEvent::ScaleFactorChanged { .. } => {
                let size = self
                    .active
                    .as_ref()
                    .map(|a| a.entry.with_window(|w| w.inner_size()));
                if let Some(size) = size {
                    self.resize(size);
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }

    fn exiting(&mut self, event_loop: &ActiveEventLoop) {
        if self.phase == Phase::Running {
            self.close(event_loop);
        }
    }
}
