use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::warn;

static LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_lock_poison_once(operation: &'static str) {
    if LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "lock poisoned; recovered inner value");
    }
}

/// Locks `mutex`, recovering the inner value if a panicking holder poisoned
/// it. All guarded state in this crate stays valid across a poisoned write,
/// so recovery is always safe here.
pub(crate) fn lock_or_recover<'a, T>(
    mutex: &'a Mutex<T>,
    operation: &'static str,
) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn_lock_poison_once(operation);
            poisoned.into_inner()
        }
    }
}
