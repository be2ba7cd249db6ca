use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Transient per-tick input flags owned by the host's native input
/// subsystem. The native key-event path latches them; this core only reads
/// them and may force-clear the directional ones when the native channel is
/// suppressed.
#[derive(Debug, Default)]
pub struct NativePressState {
    forward: AtomicBool,
    back: AtomicBool,
    left: AtomicBool,
    right: AtomicBool,
    jump: AtomicBool,
    sneak: AtomicBool,
}

impl NativePressState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_forward(&self, pressed: bool) {
        self.forward.store(pressed, Ordering::Relaxed);
    }

    pub fn set_back(&self, pressed: bool) {
        self.back.store(pressed, Ordering::Relaxed);
    }

    pub fn set_left(&self, pressed: bool) {
        self.left.store(pressed, Ordering::Relaxed);
    }

    pub fn set_right(&self, pressed: bool) {
        self.right.store(pressed, Ordering::Relaxed);
    }

    pub fn set_jump(&self, pressed: bool) {
        self.jump.store(pressed, Ordering::Relaxed);
    }

    pub fn set_sneak(&self, pressed: bool) {
        self.sneak.store(pressed, Ordering::Relaxed);
    }

    /// Clears the four directional flags. Jump and sneak stay latched; the
    /// merge excludes them by policy instead.
    pub fn clear_directional(&self) {
        self.forward.store(false, Ordering::Relaxed);
        self.back.store(false, Ordering::Relaxed);
        self.left.store(false, Ordering::Relaxed);
        self.right.store(false, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_forward(&self) -> bool {
        self.forward.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_back(&self) -> bool {
        self.back.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_left(&self) -> bool {
        self.left.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_right(&self) -> bool {
        self.right.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_jump(&self) -> bool {
        self.jump.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_sneak(&self) -> bool {
        self.sneak.load(Ordering::Relaxed)
    }
}

/// One tick's worth of native-channel movement values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NativeContribution {
    pub forward: f32,
    pub sideways: f32,
    pub jumping: bool,
    pub sneaking: bool,
}

/// The host engine's own per-tick movement computation, invoked explicitly
/// by the blended handler instead of through an override chain.
pub trait NativeMovementComputer: Send {
    /// Computes this tick's native contribution. `speed_factor` scales the
    /// directional amounts when `slow_down` holds (the engine's sneak
    /// slowdown).
    fn tick(&mut self, slow_down: bool, speed_factor: f32) -> NativeContribution;

    /// Force-clears latched directional press-state so a stale held key
    /// cannot keep contributing after the channel is suppressed.
    fn clear_pressed(&mut self);
}

/// Reference native computer over a shared [`NativePressState`]: each held
/// direction contributes a full unit on its axis, opposite directions cancel.
pub struct KeyboardNativeComputer {
    press_state: Arc<NativePressState>,
}

impl KeyboardNativeComputer {
    #[must_use]
    pub fn new(press_state: Arc<NativePressState>) -> Self {
        Self { press_state }
    }
}

impl NativeMovementComputer for KeyboardNativeComputer {
    fn tick(&mut self, slow_down: bool, speed_factor: f32) -> NativeContribution {
        let mut forward = axis(self.press_state.is_forward(), self.press_state.is_back());
        let mut sideways = axis(self.press_state.is_left(), self.press_state.is_right());

        if slow_down {
            forward *= speed_factor;
            sideways *= speed_factor;
        }

        NativeContribution {
            forward,
            sideways,
            jumping: self.press_state.is_jump(),
            sneaking: self.press_state.is_sneak(),
        }
    }

    fn clear_pressed(&mut self) {
        self.press_state.clear_directional();
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
    use super::*;

    #[test]
    fn opposite_directions_cancel() {
        let press = Arc::new(NativePressState::new());
        press.set_forward(true);
        press.set_back(true);
        let mut computer = KeyboardNativeComputer::new(Arc::clone(&press));

        let contribution = computer.tick(false, 1.0);
        assert_eq!(contribution.forward, 0.0);
    }

    #[test]
    fn held_directions_contribute_full_units() {
        let press = Arc::new(NativePressState::new());
        press.set_forward(true);
        press.set_right(true);
        let mut computer = KeyboardNativeComputer::new(Arc::clone(&press));

        let contribution = computer.tick(false, 1.0);
        assert_eq!(contribution.forward, 1.0);
        assert_eq!(contribution.sideways, -1.0);
    }

    #[test]
    fn slow_down_scales_directional_amounts_only() {
        let press = Arc::new(NativePressState::new());
        press.set_forward(true);
        press.set_jump(true);
        let mut computer = KeyboardNativeComputer::new(Arc::clone(&press));

        let contribution = computer.tick(true, 0.3);
        assert!((contribution.forward - 0.3).abs() < f32::EPSILON);
        assert!(contribution.jumping);
    }

    #[test]
    fn clear_pressed_drops_directional_but_keeps_jump_and_sneak() {
        let press = Arc::new(NativePressState::new());
        press.set_forward(true);
        press.set_left(true);
        press.set_jump(true);
        press.set_sneak(true);
        let mut computer = KeyboardNativeComputer::new(Arc::clone(&press));

        computer.clear_pressed();
        let contribution = computer.tick(false, 1.0);

        assert_eq!(contribution.forward, 0.0);
        assert_eq!(contribution.sideways, 0.0);
        assert!(contribution.jumping);
        assert!(contribution.sneaking);
    }

    #[test]
    fn new_native_events_can_relatch_after_clear() {
        let press = Arc::new(NativePressState::new());
        press.set_forward(true);
        let mut computer = KeyboardNativeComputer::new(Arc::clone(&press));

        computer.clear_pressed();
        press.set_forward(true);

        assert_eq!(computer.tick(false, 1.0).forward, 1.0);
    }
}
