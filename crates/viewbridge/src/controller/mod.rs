mod avatar;

pub use avatar::AvatarInputController;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use tracing::debug;
use winit::keyboard::KeyCode;

use crate::clock::FrameClock;
use crate::events::{FrameEvents, SubscriptionId};
use crate::keybinds::{Action, Keybinds};
use crate::locks::lock_or_recover;

/// Per-frame behavior of an input controller.
///
/// Implementors embed a [`ControllerBase`] and decide what acting on the
/// keybind table means for one frame; the base provides the cross-cutting
/// guarantees (keybind storage, clock gating, teardown).
pub trait Controller: Send + Sync {
    fn base(&self) -> &ControllerBase;

    /// Called at most once per distinct render-loop timestamp with a
    /// positive delta in milliseconds.
    fn tick(&self, delta_ms: u64);
}

/// Drives a controller from a start-of-frame callback: closed controllers
/// and zero-delta frames are filtered out before `tick` runs.
///
/// Concrete controllers forward their `FrameStartListener` impl here.
pub fn drive_frame<C: Controller + ?Sized>(controller: &C, now_ms: u64) {
    let base = controller.base();
    if base.is_closed() {
        return;
    }
    let Some(delta) = base.advance_clock(now_ms) else {
        return;
    };
    controller.tick(delta);
}

/// Shared state and lifecycle of every input controller: the keybind table,
/// the frame clock, the closed flag, and the render-loop subscription.
pub struct ControllerBase {
    events: Arc<FrameEvents>,
    keybinds: Mutex<Keybinds>,
    clock: Mutex<FrameClock>,
    closed: AtomicBool,
    subscription: OnceLock<SubscriptionId>,
}

impl ControllerBase {
    #[must_use]
    pub fn new(events: Arc<FrameEvents>) -> Self {
        Self {
            events,
            keybinds: Mutex::new(Keybinds::new()),
            clock: Mutex::new(FrameClock::new()),
            closed: AtomicBool::new(false),
            subscription: OnceLock::new(),
        }
    }

    /// Merges bindings into the table; later entries override earlier ones
    /// for the same key.
    pub fn put_keybinds(&self, binds: Keybinds) {
        lock_or_recover(&self.keybinds, "keybinds_put").extend(binds);
    }

    /// Snapshot of the current table.
    #[must_use]
    pub fn keybinds(&self) -> Keybinds {
        lock_or_recover(&self.keybinds, "keybinds_read").clone()
    }

    #[must_use]
    pub fn lookup(&self, key: KeyCode) -> Option<Action> {
        lock_or_recover(&self.keybinds, "keybinds_lookup")
            .get(&key)
            .copied()
    }

    #[must_use]
    pub fn is_keybind(&self, key: KeyCode, action: Action) -> bool {
        self.lookup(key) == Some(action)
    }

    /// Records the render-loop subscription handle so `close` can tear it
    /// down symmetrically. Set once during construction.
    pub fn bind_subscription(&self, id: SubscriptionId) {
        let _ = self.subscription.set(id);
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Explicit deterministic teardown: unregisters from the render loop and
    /// marks the controller closed. Idempotent; ticks and key events after
    /// close are no-ops.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(id) = self.subscription.get() {
            self.events.unregister(*id);
        }
        debug!("controller_closed");
    }

    fn advance_clock(&self, now_ms: u64) -> Option<u64> {
        lock_or_recover(&self.clock, "frame_clock_advance").advance(now_ms)
    }
}
