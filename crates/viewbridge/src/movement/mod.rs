mod blended;
mod native;

pub use blended::BlendedMovementHandler;
pub use native::{
    KeyboardNativeComputer, NativeContribution, NativeMovementComputer, NativePressState,
};

/// Position of the avatar's camera anchor in engine units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Raw movement intent contributed by the programmatic override channel.
///
/// The amounts are seeds added into the merged accumulators on every tick;
/// they are not themselves clamped, only the merged result is.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementState {
    pub forward_amount: f32,
    pub sideways_amount: f32,
    pub jumping: bool,
    pub sneaking: bool,
}

/// Engine-consumable movement values produced by one merge tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementOutput {
    /// Merged forward amount, clamped to [-1, 1].
    pub forward: f32,
    /// Merged sideways amount (positive is left), clamped to [-1, 1].
    pub sideways: f32,
    pub jumping: bool,
    pub sneaking: bool,
}

/// The avatar entity the host engine exposes to this core.
///
/// Look direction and position are pass-through: they belong to a separate
/// continuous-delta channel and are never blended.
pub trait AvatarHandle: Send + Sync {
    fn position(&self) -> Vec3;
    fn pitch(&self) -> f32;
    fn yaw(&self) -> f32;
    fn set_pitch(&self, pitch: f32);
    fn set_yaw(&self, yaw: f32);
    /// Rotates the look direction by a cursor-style delta, in the engine's
    /// own per-count units.
    fn change_look_direction(&self, dx: f64, dy: f64);
}

/// Programmatic movement-override surface consumed by input controllers.
///
/// The `set_*` amount mutators are unconditional overwrites of the
/// corresponding seed field; there is no validation beyond non-finite
/// rejection and no side effect beyond storage.
pub trait MovementHandler: Send + Sync {
    fn set_forward_amount(&self, amount: f32);
    fn set_sideways_amount(&self, amount: f32);
    fn set_jumping(&self, jumping: bool);
    fn set_sneaking(&self, sneaking: bool);

    fn set_pitch(&self, pitch: f32);
    fn set_yaw(&self, yaw: f32);
    fn change_look_direction(&self, dx: f64, dy: f64);

    fn position(&self) -> Vec3;
    fn pitch(&self) -> f32;
    fn yaw(&self) -> f32;
}

/// Switch deciding whether the native input channel participates in the
/// merge. Kept separate from [`MovementHandler`] so controllers that never
/// take exclusive control do not need it.
pub trait NativeOverrideSwitch: Send + Sync {
    /// Toggles suppression of the native channel. Enabling suppression also
    /// force-clears any latched native directional press-state, atomically
    /// with the flag write.
    fn set_ignore_native(&self, ignore_native: bool);
    fn should_ignore_native(&self) -> bool;
}
