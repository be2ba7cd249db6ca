use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};
use viewbridge::{
    AvatarHandle, BlendedMovementHandler, MovementOutput, RenderTargetProvider, Vec3, ViewportId,
};

const LOOK_DEGREES_PER_COUNT: f32 = 0.15;
const PITCH_LIMIT_DEGREES: f32 = 90.0;
const WALK_SPEED_UNITS_PER_SECOND: f32 = 4.3;
const JUMP_VELOCITY_UNITS_PER_SECOND: f32 = 8.0;
const GRAVITY_UNITS_PER_SECOND_SQUARED: f32 = 24.0;

/// The sneak slowdown the engine feeds into the movement merge.
pub(crate) const SNEAK_SPEED_FACTOR: f32 = 0.3;

fn recover<'a, T>(
    guard: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>,
) -> MutexGuard<'a, T> {
    guard.unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, Default)]
struct AvatarState {
    position: Vec3,
    pitch: f32,
    yaw: f32,
}

/// The stub engine's player entity.
#[derive(Default)]
pub(crate) struct StudioAvatar {
    state: Mutex<AvatarState>,
}

impl AvatarHandle for StudioAvatar {
    fn position(&self) -> Vec3 {
        recover(self.state.lock()).position
    }

    fn pitch(&self) -> f32 {
        recover(self.state.lock()).pitch
    }

    fn yaw(&self) -> f32 {
        recover(self.state.lock()).yaw
    }

    fn set_pitch(&self, pitch: f32) {
        recover(self.state.lock()).pitch = clamp_pitch(pitch);
    }

    fn set_yaw(&self, yaw: f32) {
        recover(self.state.lock()).yaw = yaw;
    }

    fn change_look_direction(&self, dx: f64, dy: f64) {
        let mut state = recover(self.state.lock());
        state.yaw += dx as f32 * LOOK_DEGREES_PER_COUNT;
        state.pitch = clamp_pitch(state.pitch + dy as f32 * LOOK_DEGREES_PER_COUNT);
    }
}

fn clamp_pitch(pitch: f32) -> f32 {
    pitch.max(-PITCH_LIMIT_DEGREES).min(PITCH_LIMIT_DEGREES)
}

/// Render-target registry of the stub engine. A real engine would reroute
/// its swap chain; the studio just remembers which viewport is active so
/// the presenter can dim an inactive one.
#[derive(Default)]
pub(crate) struct StudioTargetProvider {
    // 0 encodes "no target"; otherwise viewport id + 1.
    target: AtomicU64,
}

impl StudioTargetProvider {
    pub(crate) fn current_target(&self) -> Option<ViewportId> {
        match self.target.load(Ordering::Relaxed) {
            0 => None,
            raw => Some(ViewportId(raw - 1)),
        }
    }
}

impl RenderTargetProvider for StudioTargetProvider {
    fn set_render_target(&self, target: Option<ViewportId>) {
        let raw = target.map_or(0, |id| id.0 + 1);
        self.target.store(raw, Ordering::Relaxed);
        info!(viewport = ?target, "render_target_changed");
    }

    fn set_custom_resolution(&self, enabled: bool) {
        debug!(enabled, "custom_resolution_toggled");
    }
}

/// Integrates merged movement output into avatar motion, one fixed-free
/// step per rendered frame.
pub(crate) struct EngineSim {
    avatar: Arc<StudioAvatar>,
    handler: Arc<BlendedMovementHandler>,
    vertical_velocity: f32,
}

impl EngineSim {
    pub(crate) fn new(avatar: Arc<StudioAvatar>, handler: Arc<BlendedMovementHandler>) -> Self {
        Self {
            avatar,
            handler,
            vertical_velocity: 0.0,
        }
    }

    pub(crate) fn avatar(&self) -> &Arc<StudioAvatar> {
        &self.avatar
    }

    /// Runs one engine tick: merge the input channels, then move the avatar.
    pub(crate) fn tick(&mut self, dt_seconds: f32) -> MovementOutput {
        let slow_down = self.handler.last_output().sneaking;
        let output = self.handler.tick(slow_down, SNEAK_SPEED_FACTOR);

        let mut state = recover(self.avatar.state.lock());
        let (sin, cos) = state.yaw.to_radians().sin_cos();
        let speed = WALK_SPEED_UNITS_PER_SECOND * dt_seconds;
        // Forward follows the facing direction; positive sideways strafes
        // left of it.
        state.position.x += (output.forward * -sin + output.sideways * -cos) * speed;
        state.position.z += (output.forward * cos + output.sideways * -sin) * speed;

        let on_ground = state.position.y <= 0.0;
        if output.jumping && on_ground {
            self.vertical_velocity = JUMP_VELOCITY_UNITS_PER_SECOND;
        }
        state.position.y += self.vertical_velocity * dt_seconds;
        self.vertical_velocity -= GRAVITY_UNITS_PER_SECOND_SQUARED * dt_seconds;
        if state.position.y <= 0.0 {
            state.position.y = 0.0;
            self.vertical_velocity = self.vertical_velocity.max(0.0);
        }

        output
    }
}
