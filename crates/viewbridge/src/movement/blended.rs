use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, trace, warn};

use crate::locks::lock_or_recover;

use super::{
    AvatarHandle, MovementHandler, MovementOutput, MovementState, NativeMovementComputer,
    NativeOverrideSwitch, Vec3,
};

static NON_FINITE_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_non_finite_once(field: &'static str) {
    if NON_FINITE_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(field, "non-finite movement amount rejected");
    }
}

struct NativeChannel {
    ignore_native: bool,
    computer: Box<dyn NativeMovementComputer>,
}

#[derive(Default)]
struct TickState {
    forward_accum: f32,
    sideways_accum: f32,
    last: MovementOutput,
}

/// Merges the programmatic override channel with the host engine's native
/// input channel once per tick.
///
/// While the native channel is live it reassigns the forward/sideways
/// accumulators every tick, so the override seeds blend additively on top of
/// fresh native values. While the native channel is suppressed nothing
/// reassigns the accumulators: the seeds keep adding into the previous
/// merged values until the clamp boundary, and the merged amounts persist
/// across ticks.
pub struct BlendedMovementHandler {
    avatar: Arc<dyn AvatarHandle>,
    // One narrow boundary around the suppression flag and the press-flag
    // clear; the UI thread writes it while the tick thread reads it.
    native: Mutex<NativeChannel>,
    seeds: Mutex<MovementState>,
    tick_state: Mutex<TickState>,
}

impl BlendedMovementHandler {
    pub fn new(avatar: Arc<dyn AvatarHandle>, computer: Box<dyn NativeMovementComputer>) -> Self {
        Self {
            avatar,
            native: Mutex::new(NativeChannel {
                ignore_native: false,
                computer,
            }),
            seeds: Mutex::new(MovementState::default()),
            tick_state: Mutex::new(TickState::default()),
        }
    }

    /// Produces this tick's engine-consumable movement values.
    ///
    /// Called once per engine tick on the frame thread. `slow_down` and
    /// `speed_factor` are forwarded to the native computer unmodified.
    pub fn tick(&self, slow_down: bool, speed_factor: f32) -> MovementOutput {
        let seeds = *lock_or_recover(&self.seeds, "movement_seeds_tick");

        let native = {
            let mut channel = lock_or_recover(&self.native, "native_channel_tick");
            if channel.ignore_native {
                None
            } else {
                Some(channel.computer.tick(slow_down, speed_factor))
            }
        };

        let mut state = lock_or_recover(&self.tick_state, "tick_state_tick");
        if let Some(native) = &native {
            state.forward_accum = native.forward;
            state.sideways_accum = native.sideways;
        }

        state.forward_accum = clamp_amount(state.forward_accum + seeds.forward_amount);
        state.sideways_accum = clamp_amount(state.sideways_accum + seeds.sideways_amount);

        let output = MovementOutput {
            forward: state.forward_accum,
            sideways: state.sideways_accum,
            jumping: seeds.jumping || native.is_some_and(|native| native.jumping),
            sneaking: seeds.sneaking || native.is_some_and(|native| native.sneaking),
        };
        state.last = output;

        trace!(
            forward = output.forward,
            sideways = output.sideways,
            jumping = output.jumping,
            sneaking = output.sneaking,
            "movement_tick"
        );
        output
    }

    /// The most recent merged values, for engine code that polls between
    /// ticks.
    #[must_use]
    pub fn last_output(&self) -> MovementOutput {
        lock_or_recover(&self.tick_state, "tick_state_read").last
    }

    /// Snapshot of the override seeds, mostly for diagnostics.
    #[must_use]
    pub fn overrides(&self) -> MovementState {
        *lock_or_recover(&self.seeds, "movement_seeds_read")
    }

    fn set_amount(&self, field: &'static str, amount: f32, write: impl FnOnce(&mut MovementState)) {
        if !amount.is_finite() {
            warn_non_finite_once(field);
            return;
        }
        write(&mut *lock_or_recover(&self.seeds, "movement_seeds_write"));
    }
}

impl MovementHandler for BlendedMovementHandler {
    fn set_forward_amount(&self, amount: f32) {
        self.set_amount("forward_amount", amount, |seeds| {
            seeds.forward_amount = amount;
        });
    }

    fn set_sideways_amount(&self, amount: f32) {
        self.set_amount("sideways_amount", amount, |seeds| {
            seeds.sideways_amount = amount;
        });
    }

    fn set_jumping(&self, jumping: bool) {
        lock_or_recover(&self.seeds, "movement_seeds_write").jumping = jumping;
    }

    fn set_sneaking(&self, sneaking: bool) {
        lock_or_recover(&self.seeds, "movement_seeds_write").sneaking = sneaking;
    }

    fn set_pitch(&self, pitch: f32) {
        self.avatar.set_pitch(pitch);
    }

    fn set_yaw(&self, yaw: f32) {
        self.avatar.set_yaw(yaw);
    }

    fn change_look_direction(&self, dx: f64, dy: f64) {
        self.avatar.change_look_direction(dx, dy);
    }

    fn position(&self) -> Vec3 {
        self.avatar.position()
    }

    fn pitch(&self) -> f32 {
        self.avatar.pitch()
    }

    fn yaw(&self) -> f32 {
        self.avatar.yaw()
    }
}

impl NativeOverrideSwitch for BlendedMovementHandler {
    fn set_ignore_native(&self, ignore_native: bool) {
        let mut channel = lock_or_recover(&self.native, "native_channel_toggle");
        channel.ignore_native = ignore_native;
        if ignore_native {
            channel.computer.clear_pressed();
        }
        drop(channel);
        debug!(ignore_native, "native_channel_toggled");
    }

    fn should_ignore_native(&self) -> bool {
        lock_or_recover(&self.native, "native_channel_read").ignore_native
    }
}

fn clamp_amount(value: f32) -> f32 {
    if value > 1.0 {
        1.0
    } else if value < -1.0 {
        -1.0
    } else {
        value
    }
}
