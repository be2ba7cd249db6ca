//! Input-blending and frame-synchronization core for embedding an engine
//! viewport inside a desktop UI.
//!
//! The UI layer and the host engine run on independently-clocked threads;
//! this crate merges programmatic movement overrides with the engine's
//! native input channel once per tick, adapts the host render loop into a
//! monotonic tick sequence, and keeps controller and viewport lifecycles
//! bound to the UI through weak, leak-safe registrations.

pub mod clock;
pub mod controller;
pub mod events;
pub mod keybinds;
mod locks;
pub mod movement;
pub mod viewport;

pub use clock::FrameClock;
pub use controller::{drive_frame, AvatarInputController, Controller, ControllerBase};
pub use events::{FrameEvents, FrameStartListener, SubscriptionId};
pub use keybinds::{default_keybinds, Action, KeybindProfile, KeybindProfileError, Keybinds};
pub use movement::{
    AvatarHandle, BlendedMovementHandler, KeyboardNativeComputer, MovementHandler,
    MovementOutput, MovementState, NativeContribution, NativeMovementComputer,
    NativeOverrideSwitch, NativePressState, Vec3,
};
pub use viewport::{
    EngineViewport, KeyEventSink, PrimaryViewport, RenderTargetProvider, SceneHandle, ViewportId,
};
