use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::{Error as PixelsError, Pixels, SurfaceTexture};
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{DeviceEvent, ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use viewbridge::{
    AvatarHandle, AvatarInputController, BlendedMovementHandler, EngineViewport, FrameEvents,
    NativePressState, PrimaryViewport,
};

use super::render::draw_frame;
use super::sim::{EngineSim, StudioTargetProvider};

#[derive(Debug, Clone)]
pub(crate) struct LoopConfig {
    pub(crate) window_title: String,
    pub(crate) window_width: u32,
    pub(crate) window_height: u32,
    pub(crate) max_frame_delta: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Viewbridge Studio".to_string(),
            window_width: 640,
            window_height: 480,
            max_frame_delta: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize presenter: {0}")]
    CreatePresenter(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub(crate) struct StudioWiring {
    pub(crate) config: LoopConfig,
    pub(crate) frame_events: Arc<FrameEvents>,
    pub(crate) viewport: Arc<PrimaryViewport>,
    pub(crate) controller: Arc<AvatarInputController<PrimaryViewport, BlendedMovementHandler>>,
    pub(crate) press_state: Arc<NativePressState>,
    pub(crate) provider: Arc<StudioTargetProvider>,
    pub(crate) sim: EngineSim,
}

/// Runs the studio window: UI-side key events feed the viewport scene or
/// the stub engine's native channel, and every redraw drives the
/// start-of-frame event source before the engine tick.
pub(crate) fn run_app(wiring: StudioWiring) -> Result<(), AppError> {
    let StudioWiring {
        config,
        frame_events,
        viewport,
        controller,
        press_state,
        provider,
        mut sim,
    } = wiring;

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window: &'static winit::window::Window = Box::leak(Box::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    ));
    let surface = SurfaceTexture::new(config.window_width, config.window_height, window);
    let mut pixels = Pixels::new(config.window_width, config.window_height, surface)
        .map_err(AppError::CreatePresenter)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    // The window now exists, which is the studio's notion of being attached
    // to a parent; visibility tracks window focus from here on.
    viewport.set_attached(true);

    info!(
        window_width = config.window_width,
        window_height = config.window_height,
        max_frame_delta_ms = config.max_frame_delta.as_millis() as u64,
        "loop_config"
    );

    let start_instant = Instant::now();
    let mut last_frame_instant = Instant::now();

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    controller.close();
                    viewport.set_attached(false);
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Focused(focused) => {
                    viewport.set_visible(focused);
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = pixels.resize_surface(new_size.width, new_size.height) {
                        warn!(error = %error, "presenter_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    handle_key_event(&event, &press_state, &viewport);
                    if is_quit_key(&event) {
                        controller.close();
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now_ms = start_instant.elapsed().as_millis() as u64;
                    frame_events.dispatch_start(now_ms);

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;
                    let frame_dt = clamp_frame_delta(raw_frame_dt, config.max_frame_delta);

                    let output = sim.tick(frame_dt.as_secs_f32());
                    let avatar = sim.avatar();
                    let active = provider
                        .current_target()
                        .is_some_and(|target| target == viewport.id());
                    draw_frame(
                        pixels.frame_mut(),
                        config.window_width,
                        config.window_height,
                        active,
                        avatar.position(),
                        avatar.yaw(),
                        output,
                    );
                    if let Err(error) = pixels.render() {
                        warn!(error = %error, "presenter_draw_failed");
                        window_target.exit();
                    }
                }
                _ => {}
            },
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta },
                ..
            } => {
                controller.add_look_delta(delta.0, delta.1);
            }
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Routes a keyboard event to one of the two input channels: the arrow-key
/// cluster stands in for the engine's native keyboard path, everything else
/// goes through the viewport scene where keybinds apply.
fn handle_key_event(event: &KeyEvent, press_state: &NativePressState, viewport: &PrimaryViewport) {
    let PhysicalKey::Code(key) = event.physical_key else {
        return;
    };
    let pressed = event.state == ElementState::Pressed;

    if apply_native_key(press_state, key, pressed) {
        return;
    }

    if pressed {
        viewport.scene().dispatch_key_pressed(key);
    } else {
        viewport.scene().dispatch_key_released(key);
    }
}

fn apply_native_key(press_state: &NativePressState, key: KeyCode, pressed: bool) -> bool {
    match key {
        KeyCode::ArrowUp => press_state.set_forward(pressed),
        KeyCode::ArrowDown => press_state.set_back(pressed),
        KeyCode::ArrowLeft => press_state.set_left(pressed),
        KeyCode::ArrowRight => press_state.set_right(pressed),
        KeyCode::Enter => press_state.set_jump(pressed),
        KeyCode::ShiftRight => press_state.set_sneak(pressed),
        _ => return false,
    }
    true
}

fn is_quit_key(event: &KeyEvent) -> bool {
    event.state == ElementState::Pressed
        && matches!(event.physical_key, PhysicalKey::Code(KeyCode::Escape))
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}
