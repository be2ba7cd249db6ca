use std::sync::{Arc, Mutex, Weak};

use tracing::{info, trace};
use winit::keyboard::KeyCode;

use crate::events::{FrameEvents, FrameStartListener};
use crate::keybinds::Action;
use crate::locks::lock_or_recover;
use crate::movement::{MovementHandler, NativeOverrideSwitch};
use crate::viewport::{EngineViewport, KeyEventSink};

use super::{drive_frame, Controller, ControllerBase};

#[derive(Debug, Clone, Copy, Default)]
struct HeldActions {
    forward: bool,
    back: bool,
    left: bool,
    right: bool,
    jump: bool,
    sneak: bool,
    capture_key_down: bool,
    capture_toggle_pending: bool,
}

/// Controller translating viewport keystrokes into continuous avatar
/// movement.
///
/// Held movement keys are latched on the UI thread and converted into
/// override seeds once per frame on the engine thread; mouse-look deltas
/// queue up the same way and are forwarded in a single batch per tick. A
/// capture keybind toggles exclusive control (native-channel suppression)
/// on the handler, edge-triggered so holding the key flips it once.
pub struct AvatarInputController<V, M> {
    base: ControllerBase,
    viewport: Arc<V>,
    handler: Arc<M>,
    held: Mutex<HeldActions>,
    pending_look: Mutex<(f64, f64)>,
}

impl<V, M> AvatarInputController<V, M>
where
    V: EngineViewport + 'static,
    M: MovementHandler + NativeOverrideSwitch + 'static,
{
    /// Creates the controller and performs its two registrations: a weak
    /// subscription on the render loop and a weak key listener on the
    /// viewport's scene. Neither registration keeps the controller alive;
    /// dropping every strong reference retires it without an explicit
    /// `close`.
    pub fn spawn(viewport: Arc<V>, handler: Arc<M>, events: &Arc<FrameEvents>) -> Arc<Self> {
        let controller = Arc::new(Self {
            base: ControllerBase::new(Arc::clone(events)),
            viewport: Arc::clone(&viewport),
            handler,
            held: Mutex::new(HeldActions::default()),
            pending_look: Mutex::new((0.0, 0.0)),
        });

        let listener_arc: Arc<dyn FrameStartListener> = Arc::clone(&controller) as Arc<dyn FrameStartListener>;
        let listener: Weak<dyn FrameStartListener> = Arc::downgrade(&listener_arc);
        controller.base.bind_subscription(events.register_weak(listener));

        let sink_arc: Arc<dyn KeyEventSink> = Arc::clone(&controller) as Arc<dyn KeyEventSink>;
        let sink: Weak<dyn KeyEventSink> = Arc::downgrade(&sink_arc);
        viewport.scene().add_key_listener(sink);

        controller
    }

    #[must_use]
    pub fn viewport(&self) -> &Arc<V> {
        &self.viewport
    }

    #[must_use]
    pub fn movement_handler(&self) -> &Arc<M> {
        &self.handler
    }

    /// Queues a mouse-look delta for the next frame tick.
    pub fn add_look_delta(&self, dx: f64, dy: f64) {
        if self.base.is_closed() {
            return;
        }
        let mut pending = lock_or_recover(&self.pending_look, "pending_look_add");
        pending.0 += dx;
        pending.1 += dy;
    }

    pub fn close(&self) {
        self.base.close();
    }

    fn apply_action(&self, action: Action, pressed: bool) {
        let mut held = lock_or_recover(&self.held, "held_actions_apply");
        match action {
            Action::MoveForward => held.forward = pressed,
            Action::MoveBack => held.back = pressed,
            Action::StrafeLeft => held.left = pressed,
            Action::StrafeRight => held.right = pressed,
            Action::Jump => held.jump = pressed,
            Action::Sneak => held.sneak = pressed,
            Action::ToggleCapture => {
                if pressed && !held.capture_key_down {
                    held.capture_toggle_pending = true;
                }
                held.capture_key_down = pressed;
            }
        }
    }
}

impl<V, M> Controller for AvatarInputController<V, M>
where
    V: EngineViewport + 'static,
    M: MovementHandler + NativeOverrideSwitch + 'static,
{
    fn base(&self) -> &ControllerBase {
        &self.base
    }

    fn tick(&self, delta_ms: u64) {
        let held = {
            let mut held = lock_or_recover(&self.held, "held_actions_tick");
            let snapshot = *held;
            held.capture_toggle_pending = false;
            snapshot
        };

        if held.capture_toggle_pending {
            let capture = !self.handler.should_ignore_native();
            self.handler.set_ignore_native(capture);
            info!(ignore_native = capture, "input_capture_toggled");
        }

        let (look_dx, look_dy) = {
            let mut pending = lock_or_recover(&self.pending_look, "pending_look_tick");
            std::mem::take(&mut *pending)
        };
        if look_dx != 0.0 || look_dy != 0.0 {
            self.handler.change_look_direction(look_dx, look_dy);
        }

        self.handler
            .set_forward_amount(axis(held.forward, held.back));
        self.handler
            .set_sideways_amount(axis(held.left, held.right));
        self.handler.set_jumping(held.jump);
        self.handler.set_sneaking(held.sneak);

        trace!(delta_ms, "avatar_controller_tick");
    }
}

impl<V, M> FrameStartListener for AvatarInputController<V, M>
where
    V: EngineViewport + 'static,
    M: MovementHandler + NativeOverrideSwitch + 'static,
{
    fn on_frame_start(&self, now_ms: u64) {
        drive_frame(self, now_ms);
    }
}

impl<V, M> KeyEventSink for AvatarInputController<V, M>
where
    V: EngineViewport + 'static,
    M: MovementHandler + NativeOverrideSwitch + 'static,
{
    fn key_pressed(&self, key: KeyCode) {
        if self.base.is_closed() {
            return;
        }
        if let Some(action) = self.base.lookup(key) {
            self.apply_action(action, true);
        }
    }

    fn key_released(&self, key: KeyCode) {
        if self.base.is_closed() {
            return;
        }
        if let Some(action) = self.base.lookup(key) {
            self.apply_action(action, false);
        }
    }
}

fn axis(positive: bool, negative: bool) -> f32 {
    match (positive, negative) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use crate::keybinds::default_keybinds;
    use crate::movement::{
        AvatarHandle, BlendedMovementHandler, KeyboardNativeComputer, NativePressState, Vec3,
    };
    use crate::viewport::{PrimaryViewport, ViewportId};

    use super::*;

    #[derive(Default)]
    struct StillAvatar {
        look_deltas: Mutex<Vec<(f64, f64)>>,
    }

    impl AvatarHandle for StillAvatar {
        fn position(&self) -> Vec3 {
            Vec3::default()
        }

        fn pitch(&self) -> f32 {
            0.0
        }

        fn yaw(&self) -> f32 {
            0.0
        }

        fn set_pitch(&self, _pitch: f32) {}

        fn set_yaw(&self, _yaw: f32) {}

        fn change_look_direction(&self, dx: f64, dy: f64) {
            self.look_deltas.lock().expect("look deltas").push((dx, dy));
        }
    }

    struct Rig {
        events: Arc<FrameEvents>,
        viewport: Arc<PrimaryViewport>,
        handler: Arc<BlendedMovementHandler>,
        press_state: Arc<NativePressState>,
    }

    impl Rig {
        fn new() -> (Self, Arc<StillAvatar>) {
            let avatar = Arc::new(StillAvatar::default());
            let press_state = Arc::new(NativePressState::new());
            let handler = Arc::new(BlendedMovementHandler::new(
                Arc::clone(&avatar) as Arc<dyn AvatarHandle>,
                Box::new(KeyboardNativeComputer::new(Arc::clone(&press_state))),
            ));
            let rig = Self {
                events: Arc::new(FrameEvents::new()),
                viewport: Arc::new(PrimaryViewport::new(ViewportId(1), None)),
                handler,
                press_state,
            };
            (rig, avatar)
        }

        fn spawn_controller(
            &self,
        ) -> Arc<AvatarInputController<PrimaryViewport, BlendedMovementHandler>> {
            let controller = AvatarInputController::spawn(
                Arc::clone(&self.viewport),
                Arc::clone(&self.handler),
                &self.events,
            );
            controller.base().put_keybinds(default_keybinds());
            controller
        }
    }

    #[test]
    fn held_movement_keys_become_override_seeds_on_tick() {
        let (rig, _avatar) = Rig::new();
        let _controller = rig.spawn_controller();

        rig.viewport.scene().dispatch_key_pressed(KeyCode::KeyW);
        rig.viewport.scene().dispatch_key_pressed(KeyCode::KeyA);
        rig.events.dispatch_start(100);

        let seeds = rig.handler.overrides();
        assert_eq!(seeds.forward_amount, 1.0);
        assert_eq!(seeds.sideways_amount, 1.0);
    }

    #[test]
    fn released_keys_zero_their_axis() {
        let (rig, _avatar) = Rig::new();
        let _controller = rig.spawn_controller();

        rig.viewport.scene().dispatch_key_pressed(KeyCode::KeyW);
        rig.events.dispatch_start(100);
        rig.viewport.scene().dispatch_key_released(KeyCode::KeyW);
        rig.events.dispatch_start(200);

        assert_eq!(rig.handler.overrides().forward_amount, 0.0);
    }

    #[test]
    fn opposite_held_keys_cancel() {
        let (rig, _avatar) = Rig::new();
        let _controller = rig.spawn_controller();

        rig.viewport.scene().dispatch_key_pressed(KeyCode::KeyW);
        rig.viewport.scene().dispatch_key_pressed(KeyCode::KeyS);
        rig.events.dispatch_start(100);

        assert_eq!(rig.handler.overrides().forward_amount, 0.0);
    }

    #[test]
    fn jump_and_sneak_keys_drive_override_flags() {
        let (rig, _avatar) = Rig::new();
        let _controller = rig.spawn_controller();

        rig.viewport.scene().dispatch_key_pressed(KeyCode::Space);
        rig.viewport
            .scene()
            .dispatch_key_pressed(KeyCode::ShiftLeft);
        rig.events.dispatch_start(100);

        let output = rig.handler.tick(false, 1.0);
        assert!(output.jumping);
        assert!(output.sneaking);
    }

    #[test]
    fn capture_toggle_is_edge_triggered() {
        let (rig, _avatar) = Rig::new();
        let _controller = rig.spawn_controller();

        rig.viewport.scene().dispatch_key_pressed(KeyCode::KeyC);
        rig.events.dispatch_start(100);
        assert!(rig.handler.should_ignore_native());

        // Held key across further frames must not flip it back.
        rig.events.dispatch_start(200);
        assert!(rig.handler.should_ignore_native());

        rig.viewport.scene().dispatch_key_released(KeyCode::KeyC);
        rig.viewport.scene().dispatch_key_pressed(KeyCode::KeyC);
        rig.events.dispatch_start(300);
        assert!(!rig.handler.should_ignore_native());
    }

    #[test]
    fn capture_toggle_clears_latched_native_press_state() {
        let (rig, _avatar) = Rig::new();
        let _controller = rig.spawn_controller();
        rig.press_state.set_forward(true);

        rig.viewport.scene().dispatch_key_pressed(KeyCode::KeyC);
        rig.events.dispatch_start(100);

        assert!(!rig.press_state.is_forward());
    }

    #[test]
    fn look_deltas_batch_into_one_forward_per_tick() {
        let (rig, avatar) = Rig::new();
        let controller = rig.spawn_controller();

        controller.add_look_delta(2.0, 1.0);
        controller.add_look_delta(3.0, -0.5);
        rig.events.dispatch_start(100);

        assert_eq!(
            avatar.look_deltas.lock().expect("look deltas").as_slice(),
            &[(5.0, 0.5)]
        );

        // Nothing queued, nothing forwarded.
        rig.events.dispatch_start(200);
        assert_eq!(avatar.look_deltas.lock().expect("look deltas").len(), 1);
    }

    #[test]
    fn unbound_keys_are_ignored() {
        let (rig, _avatar) = Rig::new();
        let _controller = rig.spawn_controller();

        rig.viewport.scene().dispatch_key_pressed(KeyCode::KeyZ);
        rig.events.dispatch_start(100);

        assert_eq!(rig.handler.overrides(), Default::default());
    }

    #[test]
    fn key_events_after_close_are_no_ops() {
        let (rig, _avatar) = Rig::new();
        let controller = rig.spawn_controller();
        controller.close();

        rig.viewport.scene().dispatch_key_pressed(KeyCode::KeyW);
        rig.events.dispatch_start(100);

        assert_eq!(rig.handler.overrides().forward_amount, 0.0);
    }

    #[test]
    fn dropped_controller_is_reclaimed_from_both_tables() {
        let (rig, _avatar) = Rig::new();
        let controller = rig.spawn_controller();
        drop(controller);

        rig.viewport.scene().dispatch_key_pressed(KeyCode::KeyW);
        rig.events.dispatch_start(100);

        assert_eq!(rig.events.len(), 0);
        assert_eq!(rig.handler.overrides().forward_amount, 0.0);
    }
}
