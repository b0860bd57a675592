use std::sync::Arc;
use std::time::Instant;

use glam::{Vec2, Vec3};
use log::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{CursorGrabMode, Window, WindowAttributes, WindowId};

use crate::camera::Camera;
use crate::config::ViewerConfig;
use crate::controls::{CursorLock, InputRouter, LockTransition};
use crate::error::ViewerError;
use crate::gpu::GpuContext;
use crate::input::Input;
use crate::renderer::{FrameRenderer, FrameState, FrameTransforms, Viewport};
use crate::timing::FrameTiming;

/// Window notifications the viewer reacts to between frames.
pub trait WindowCallbacks {
    /// The framebuffer was resized to `width` x `height` pixels.
    fn on_resize(&mut self, width: u32, height: u32);
    /// The cursor moved to an absolute window position.
    fn on_cursor_move(&mut self, x: f64, y: f64);
    /// The scroll wheel moved by the given line offsets.
    fn on_scroll(&mut self, x: f64, y: f64);
}

/// Window-independent state of a running viewer.
///
/// Everything here can be driven without a window or GPU, which is how the
/// integration tests exercise the frame loop.
#[derive(Debug)]
pub struct ViewerContext {
    pub camera: Camera,
    pub router: InputRouter,
    pub timing: FrameTiming,
    pub viewport: Viewport,
    should_close: bool,
}

impl ViewerContext {
    pub fn new(config: &ViewerConfig, start: Instant) -> Self {
        let camera = Camera::new()
            .position(Vec3::from(config.camera_position))
            .speed(config.camera_speed)
            .sensitivity(config.mouse_sensitivity)
            .zoom_range(config.zoom_range);
        Self {
            camera,
            router: InputRouter::new(config.key_bindings.clone()),
            timing: FrameTiming::new(start),
            viewport: Viewport::new(config.width, config.height),
            should_close: false,
        }
    }

    /// Start a frame: route this frame's keys, then advance the clock.
    ///
    /// Movement is scaled by the delta time of the previous frame, since the
    /// new one is only measured afterwards.
    pub fn begin_frame(&mut self, input: &Input, now: Instant) -> Option<LockTransition> {
        let transition =
            self.router
                .route_keys(input, &mut self.camera, self.timing.delta_time());
        if transition == Some(LockTransition::CloseRequested) {
            self.should_close = true;
        }
        self.timing.tick(now);
        transition
    }

    /// Whether the viewer has been asked to close.
    pub fn should_close(&self) -> bool {
        self.should_close
    }

    pub fn request_close(&mut self) {
        self.should_close = true;
    }

    /// Relative pointer motion, used instead of cursor positions while the
    /// OS keeps a locked cursor pinned in place.
    pub fn on_pointer_motion(&mut self, dx: f64, dy: f64) {
        self.router
            .pointer_moved(Vec2::new(dx as f32, dy as f32), &mut self.camera);
    }

    pub fn transforms(&self, near: f32, far: f32) -> FrameTransforms {
        FrameTransforms::new(&self.camera, self.viewport, near, far)
    }
}

impl WindowCallbacks for ViewerContext {
    fn on_resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width, height);
    }

    fn on_cursor_move(&mut self, x: f64, y: f64) {
        self.router
            .cursor_moved(Vec2::new(x as f32, y as f32), &mut self.camera);
    }

    fn on_scroll(&mut self, _x: f64, y: f64) {
        self.camera.process_mouse_scroll(y as f32);
    }
}

/// Open the viewer window and run until it is closed.
///
/// Blocks the calling thread. Returns an error if the event loop, window or
/// GPU could not be set up; shader and texture problems are only logged.
pub fn run(config: ViewerConfig) -> Result<(), ViewerError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::Pending {
        config,
        init_error: None,
    };
    event_loop.run_app(&mut app)?;

    match app {
        ViewerApp::Pending {
            init_error: Some(err),
            ..
        } => Err(err),
        _ => Ok(()),
    }
}

enum ViewerApp {
    Pending {
        config: ViewerConfig,
        init_error: Option<ViewerError>,
    },
    Running(Box<Running>),
}

struct Running {
    config: ViewerConfig,
    window: Arc<Window>,
    gpu: GpuContext,
    renderer: FrameRenderer,
    input: Input,
    ctx: ViewerContext,
    /// The cursor is grabbed in place, so look comes from raw device motion.
    pointer_pinned: bool,
}

impl Running {
    fn new(event_loop: &ActiveEventLoop, config: &ViewerConfig) -> Result<Self, ViewerError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu = GpuContext::new(window.clone())?;
        let renderer = FrameRenderer::new(&gpu, config);

        let mut ctx = ViewerContext::new(config, Instant::now());
        ctx.on_resize(gpu.width(), gpu.height());
        let pointer_pinned = apply_cursor_lock(&window, CursorLock::Locked);
        info!("viewer started ({}x{})", gpu.width(), gpu.height());

        Ok(Self {
            config: config.clone(),
            window,
            gpu,
            renderer,
            input: Input::new(),
            ctx,
            pointer_pinned,
        })
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        if self.ctx.should_close() {
            event_loop.exit();
            return;
        }

        match self.ctx.begin_frame(&self.input, Instant::now()) {
            Some(LockTransition::Released) => {
                self.pointer_pinned = apply_cursor_lock(&self.window, CursorLock::Unlocked);
            }
            Some(LockTransition::Relocked) => {
                self.pointer_pinned = apply_cursor_lock(&self.window, CursorLock::Locked);
            }
            Some(LockTransition::CloseRequested) | None => {}
        }

        let frame = FrameState {
            transforms: self.ctx.transforms(self.config.near, self.config.far),
            time: self.ctx.timing.elapsed(),
        };
        self.renderer.render(&self.gpu, &frame);

        self.input.begin_frame();
        self.window.request_redraw();
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let ViewerApp::Pending { config, init_error } = self else {
            return;
        };
        match Running::new(event_loop, config) {
            Ok(running) => {
                running.window.request_redraw();
                *self = ViewerApp::Running(Box::new(running));
            }
            Err(err) => {
                error!("failed to start viewer: {err}");
                *init_error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let ViewerApp::Running(app) = self else {
            return;
        };

        app.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                app.ctx.request_close();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                app.ctx.on_resize(size.width, size.height);
                app.gpu.resize(size.width, size.height);
                app.renderer.ensure_depth_size(&app.gpu);
            }
            WindowEvent::CursorMoved { position, .. } if !app.pointer_pinned => {
                app.ctx.on_cursor_move(position.x, position.y);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let (x, y) = match delta {
                    MouseScrollDelta::LineDelta(x, y) => (x as f64, y as f64),
                    MouseScrollDelta::PixelDelta(pos) => (pos.x / 120.0, pos.y / 120.0),
                };
                app.ctx.on_scroll(x, y);
            }
            WindowEvent::RedrawRequested => app.redraw(event_loop),
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        let ViewerApp::Running(app) = self else {
            return;
        };
        match event {
            DeviceEvent::MouseMotion { delta: (dx, dy) } if app.pointer_pinned => {
                app.ctx.on_pointer_motion(dx, dy);
            }
            _ => {}
        }
    }
}

/// Mirror the router's lock state onto the OS cursor.
///
/// Returns true when the cursor ended up pinned in place, in which case
/// `CursorMoved` stops reporting motion and look has to come from
/// `DeviceEvent::MouseMotion`. Confining is tried first so position samples
/// keep arriving; macOS only supports locking.
fn apply_cursor_lock(window: &Window, lock: CursorLock) -> bool {
    match lock {
        CursorLock::Locked => {
            window.set_cursor_visible(false);
            match window.set_cursor_grab(CursorGrabMode::Confined) {
                Ok(()) => false,
                Err(_) => match window.set_cursor_grab(CursorGrabMode::Locked) {
                    Ok(()) => true,
                    Err(err) => {
                        warn!("could not grab cursor: {err}");
                        false
                    }
                },
            }
        }
        CursorLock::Unlocked => {
            if let Err(err) = window.set_cursor_grab(CursorGrabMode::None) {
                warn!("could not release cursor: {err}");
            }
            window.set_cursor_visible(true);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use winit::keyboard::KeyCode;

    use super::*;

    fn context() -> (ViewerContext, Instant) {
        let start = Instant::now();
        (ViewerContext::new(&ViewerConfig::default(), start), start)
    }

    #[test]
    fn context_follows_config() {
        let config = ViewerConfig::new()
            .size(640, 480)
            .camera_position([1.0, 2.0, 3.0]);
        let ctx = ViewerContext::new(&config, Instant::now());
        assert_eq!(ctx.viewport, Viewport::new(640, 480));
        assert_eq!(ctx.camera.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(ctx.router.lock_state(), CursorLock::Locked);
    }

    #[test]
    fn movement_uses_previous_frame_delta() {
        let (mut ctx, start) = context();
        let mut input = Input::new();
        input.press(KeyCode::KeyW);

        // First frame has no previous delta, so nothing moves yet.
        ctx.begin_frame(&input, start);
        assert_eq!(ctx.camera.position, Vec3::new(0.0, 0.0, 3.0));

        ctx.begin_frame(&input, start + Duration::from_millis(500));
        assert_eq!(ctx.camera.position, Vec3::new(0.0, 0.0, 3.0));

        ctx.begin_frame(&input, start + Duration::from_millis(600));
        let expected = 3.0 - ctx.camera.speed * 0.5;
        assert!((ctx.camera.position.z - expected).abs() < 1e-5);
    }

    #[test]
    fn second_escape_requests_close() {
        let (mut ctx, start) = context();
        let mut input = Input::new();

        input.press(KeyCode::Escape);
        assert_eq!(ctx.begin_frame(&input, start), Some(LockTransition::Released));
        assert!(!ctx.should_close());

        input.release(KeyCode::Escape);
        input.begin_frame();
        input.press(KeyCode::Escape);
        assert_eq!(
            ctx.begin_frame(&input, start),
            Some(LockTransition::CloseRequested)
        );
        assert!(ctx.should_close());
    }

    #[test]
    fn pointer_motion_steers_until_released() {
        let (mut ctx, start) = context();
        ctx.camera.sensitivity = 1.0;
        ctx.on_pointer_motion(15.0, -10.0);
        assert_eq!(ctx.camera.yaw_degrees(), -75.0);
        assert_eq!(ctx.camera.pitch_degrees(), 10.0);

        let mut input = Input::new();
        input.press(KeyCode::Escape);
        ctx.begin_frame(&input, start);
        ctx.on_pointer_motion(100.0, 100.0);
        assert_eq!(ctx.camera.yaw_degrees(), -75.0);
    }

    #[test]
    fn scroll_zooms_camera() {
        let (mut ctx, _) = context();
        ctx.on_scroll(0.0, 5.0);
        assert_eq!(ctx.camera.fov_degrees(), 40.0);
    }
}
