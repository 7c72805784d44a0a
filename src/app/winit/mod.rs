//! Winit Application Runner
//!
//! Owns the window, the [`WgpuBackend`], the default scene and the
//! [`ShadowRenderer`], and translates window events into renderer calls:
//!
//! - `Resized` updates the viewport (applied at the next frame)
//! - `Occluded` suspends rendering until the window shows again
//! - `RedrawRequested` renders one frame and asks for the next
//! - `CloseRequested` or Escape exits the loop
//!
//! ```rust,ignore
//! use umbra::app::App;
//! use umbra::settings::Settings;
//!
//! App::new(Settings::default()).with_title("Shadows").run()?;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use crate::errors::{Result, UmbraError};
use crate::renderer::gpu::WgpuBackend;
use crate::renderer::{FrameOutcome, ShadowRenderer};
use crate::scene::{SceneDrawList, build_default_scene};
use crate::settings::Settings;

const FPS_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Application builder.
pub struct App {
    title: String,
    settings: Settings,
}

impl App {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            title: "Umbra - Shadow Map".into(),
            settings,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Runs the event loop until the window closes.
    ///
    /// Initialization failures inside the loop (adapter, device, shadow
    /// target, scene upload) are returned once the loop has exited.
    pub fn run(self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut runner = AppRunner::new(self.title, self.settings);
        event_loop.run_app(&mut runner)?;

        match runner.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// State that exists only once the window does.
struct Running {
    window: Arc<Window>,
    backend: WgpuBackend,
    scene: SceneDrawList,
    renderer: ShadowRenderer,
}

struct AppRunner {
    title: String,
    settings: Settings,
    running: Option<Running>,
    fatal: Option<UmbraError>,
    start_time: Instant,
    last_fps_log: Instant,
}

impl AppRunner {
    fn new(title: String, settings: Settings) -> Self {
        let now = Instant::now();
        Self {
            title,
            settings,
            running: None,
            fatal: None,
            start_time: now,
            last_fps_log: now,
        }
    }

    fn init(&self, event_loop: &ActiveEventLoop) -> Result<Running> {
        let [width, height] = self.settings.render.window_size;
        let window_attributes = Window::default_attributes()
            .with_title(&self.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(width, height));

        let window = event_loop
            .create_window(window_attributes)
            .map_err(|e| UmbraError::SurfaceError(e.to_string()))?;
        let window = Arc::new(window);

        log::info!("Initializing Renderer Backend...");

        let mut render_settings = self.settings.render.clone();
        let size = window.inner_size();
        render_settings.window_size = [size.width, size.height];

        let mut backend = WgpuBackend::new(window.clone(), &render_settings)?;
        let scene = build_default_scene(&mut backend)?;
        let renderer = ShadowRenderer::new(&render_settings, &self.settings.scene)?;

        Ok(Running {
            window,
            backend,
            scene,
            renderer,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: UmbraError) {
        log::error!("Fatal Renderer Error: {err}");
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(running) = &mut self.running else {
            return;
        };

        let elapsed = self.start_time.elapsed();
        let outcome = running
            .renderer
            .render_frame(&mut running.backend, &running.scene, elapsed);

        match outcome {
            Ok(FrameOutcome::Rendered(_)) => {
                if self.last_fps_log.elapsed() >= FPS_LOG_INTERVAL {
                    self.last_fps_log = Instant::now();
                    log::info!(
                        "{:.1} fps, frame {}",
                        running.renderer.fps(),
                        running.renderer.frame_count()
                    );
                }
                running.window.request_redraw();
            }
            Ok(FrameOutcome::Skipped(reason)) => {
                log::trace!("Frame skipped: {reason:?}");
            }
            Err(err) => self.fail(event_loop, err),
        }
    }
}

impl ApplicationHandler for AppRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }

        match self.init(event_loop) {
            Ok(running) => {
                running.window.request_redraw();
                self.running = Some(running);
                let now = Instant::now();
                self.start_time = now;
                self.last_fps_log = now;
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                log::info!("Exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(running) = &mut self.running {
                    running.renderer.resize(size.width, size.height);
                    running.window.request_redraw();
                }
            }
            WindowEvent::Occluded(occluded) => {
                if let Some(running) = &mut self.running {
                    running.renderer.set_visible(!occluded);
                    if !occluded {
                        running.window.request_redraw();
                    }
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = &self.running {
            running.window.request_redraw();
        }
    }
}
