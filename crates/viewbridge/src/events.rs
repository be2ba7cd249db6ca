use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::debug;

use crate::locks::lock_or_recover;

/// Receives the host render loop's start-of-frame callback.
///
/// `now_ms` is a monotonic millisecond timestamp chosen by whoever drives
/// [`FrameEvents::dispatch_start`]; listeners only ever compare consecutive
/// values.
pub trait FrameStartListener: Send + Sync {
    fn on_frame_start(&self, now_ms: u64);
}

/// Handle returned by [`FrameEvents::register_weak`], used for explicit
/// symmetric teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    listener: Weak<dyn FrameStartListener>,
}

/// Start-of-frame event source with a weak subscriber table.
///
/// Registration stores only a [`Weak`] reference, so the source never keeps
/// a subscriber alive: once every strong reference is dropped the entry goes
/// stale and is pruned on the next dispatch. Explicit
/// [`unregister`](FrameEvents::unregister) remains available for
/// deterministic teardown.
#[derive(Default)]
pub struct FrameEvents {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl FrameEvents {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_weak(&self, listener: Weak<dyn FrameStartListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock_or_recover(&self.subscribers, "frame_events_register")
            .push(Subscriber { id, listener });
        debug!(subscription = id.0, "frame_listener_registered");
        id
    }

    /// Removes a subscription. Unknown ids (already pruned, already
    /// unregistered) are ignored.
    pub fn unregister(&self, id: SubscriptionId) {
        let mut subscribers = lock_or_recover(&self.subscribers, "frame_events_unregister");
        let before = subscribers.len();
        subscribers.retain(|entry| entry.id != id);
        if subscribers.len() < before {
            debug!(subscription = id.0, "frame_listener_unregistered");
        }
    }

    /// Fires the start-of-frame event.
    ///
    /// Live listeners are invoked in registration order; stale entries are
    /// pruned in the same pass. The subscriber table lock is released before
    /// any listener runs, so listeners may re-enter the source (for example
    /// to unregister themselves).
    pub fn dispatch_start(&self, now_ms: u64) {
        let live: Vec<Arc<dyn FrameStartListener>> = {
            let mut subscribers = lock_or_recover(&self.subscribers, "frame_events_dispatch");
            let mut upgraded = Vec::with_capacity(subscribers.len());
            subscribers.retain(|entry| match entry.listener.upgrade() {
                Some(listener) => {
                    upgraded.push(listener);
                    true
                }
                None => false,
            });
            upgraded
        };

        for listener in live {
            listener.on_frame_start(now_ms);
        }
    }

    /// Number of table entries, stale ones included until the next dispatch.
    #[must_use]
    pub fn len(&self) -> usize {
        lock_or_recover(&self.subscribers, "frame_events_len").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
