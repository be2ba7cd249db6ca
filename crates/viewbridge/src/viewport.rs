use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::debug;
use winit::keyboard::KeyCode;

use crate::locks::lock_or_recover;

/// Identifies a logical viewport toward the host engine's render-target
/// registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewportId(pub u64);

/// Receives raw key events from a viewport's scene.
pub trait KeyEventSink: Send + Sync {
    fn key_pressed(&self, key: KeyCode);
    fn key_released(&self, key: KeyCode);
}

/// The UI toolkit seam: key-press and key-release notifications carrying a
/// key-code, fanned out to weakly-held listeners.
///
/// Like the frame event source, the table holds only [`Weak`] references;
/// a listener that loses its last strong reference silently stops receiving
/// events and is pruned on the next dispatch.
#[derive(Default)]
pub struct SceneHandle {
    listeners: Mutex<Vec<Weak<dyn KeyEventSink>>>,
}

impl SceneHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_key_listener(&self, listener: Weak<dyn KeyEventSink>) {
        lock_or_recover(&self.listeners, "scene_listeners_add").push(listener);
    }

    pub fn dispatch_key_pressed(&self, key: KeyCode) {
        for listener in self.live_listeners() {
            listener.key_pressed(key);
        }
    }

    pub fn dispatch_key_released(&self, key: KeyCode) {
        for listener in self.live_listeners() {
            listener.key_released(key);
        }
    }

    fn live_listeners(&self) -> Vec<Arc<dyn KeyEventSink>> {
        let mut listeners = lock_or_recover(&self.listeners, "scene_listeners_dispatch");
        let mut live = Vec::with_capacity(listeners.len());
        listeners.retain(|entry| match entry.upgrade() {
            Some(listener) => {
                live.push(listener);
                true
            }
            None => false,
        });
        live
    }
}

/// A UI-side viewport displaying the engine's rendered output.
pub trait EngineViewport: Send + Sync {
    fn id(&self) -> ViewportId;
    fn scene(&self) -> &SceneHandle;
}

/// Host capability for routing rendered frames: set or clear the active
/// render target and toggle custom-resolution mode for it.
pub trait RenderTargetProvider: Send + Sync {
    fn set_render_target(&self, target: Option<ViewportId>);
    fn set_custom_resolution(&self, enabled: bool);
}

#[derive(Debug, Clone, Copy)]
struct AttachmentState {
    visible: bool,
    attached: bool,
}

impl AttachmentState {
    fn is_active(self) -> bool {
        self.visible && self.attached
    }
}

/// Viewport displaying the host engine's primary output, keeping its
/// render-target registration synchronized with UI visibility and
/// parent-attachment state.
///
/// The provider capability is resolved once at construction; when it is
/// absent (tooling hosts, tests) the viewport stays fully functional but
/// inert, skipping registration updates.
pub struct PrimaryViewport {
    id: ViewportId,
    scene: SceneHandle,
    provider: Option<Arc<dyn RenderTargetProvider>>,
    state: Mutex<AttachmentState>,
    provider_missing_logged: AtomicBool,
}

impl PrimaryViewport {
    /// Creates a detached viewport. Visibility starts true (the UI default)
    /// and attachment false, so the viewport is inactive until attached.
    #[must_use]
    pub fn new(id: ViewportId, provider: Option<Arc<dyn RenderTargetProvider>>) -> Self {
        Self {
            id,
            scene: SceneHandle::new(),
            provider,
            state: Mutex::new(AttachmentState {
                visible: true,
                attached: false,
            }),
            provider_missing_logged: AtomicBool::new(false),
        }
    }

    /// Visibility property-change notification from the UI layer.
    pub fn set_visible(&self, visible: bool) {
        let state = {
            let mut state = lock_or_recover(&self.state, "viewport_state_visible");
            state.visible = visible;
            *state
        };
        self.apply(state);
    }

    /// Parent-attachment property-change notification from the UI layer.
    pub fn set_attached(&self, attached: bool) {
        let state = {
            let mut state = lock_or_recover(&self.state, "viewport_state_attached");
            state.attached = attached;
            *state
        };
        self.apply(state);
    }

    /// Whether the viewport currently satisfies the active predicate.
    #[must_use]
    pub fn is_active(&self) -> bool {
        lock_or_recover(&self.state, "viewport_state_read").is_active()
    }

    // The two notification sources are independent and unordered, so the
    // predicate is recomputed from both current values on every change.
    fn apply(&self, state: AttachmentState) {
        let Some(provider) = &self.provider else {
            if self
                .provider_missing_logged
                .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                debug!(viewport = self.id.0, "render target provider unavailable");
            }
            return;
        };

        if state.is_active() {
            provider.set_render_target(Some(self.id));
            provider.set_custom_resolution(true);
        } else {
            provider.set_render_target(None);
        }
    }
}

impl EngineViewport for PrimaryViewport {
    fn id(&self) -> ViewportId {
        self.id
    }

    fn scene(&self) -> &SceneHandle {
        &self.scene
    }
}
