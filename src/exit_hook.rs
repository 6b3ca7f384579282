//! The single termination-time cleanup pass.
//!
//! Every registry that tracks at least one resource enrolls here. The first
//! enrollment installs one `atexit` callback for the whole process, which
//! synchronously drains every enrolled registry before the process exits.
//!
//! Enrolled registries are held strongly so that the paths of a dropped
//! [`Temp`](crate::Temp) are still removed. A registry that nobody else holds
//! and that has nothing left to delete is pruned on the next enrollment.

use crate::cleanup;
use crate::registry::Registry;
use crate::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once, PoisonError};

static HOOK: Once = Once::new();
static INSTALLED_HOOKS: AtomicUsize = AtomicUsize::new(0);
static ENROLLED: Mutex<Vec<Arc<Registry>>> = Mutex::new(Vec::new());

/// Enrolls `registry` for the exit-time drain, installing the process exit
/// callback if this is the first enrollment.
pub(crate) fn ensure_installed(registry: Arc<Registry>) {
    {
        let mut enrolled = ENROLLED.lock().unwrap_or_else(PoisonError::into_inner);
        // A count of one means only this list holds it, so it can no longer gain entries.
        enrolled.retain(|r| Arc::strong_count(r) > 1 || !r.is_drained());
        enrolled.push(registry);
    }

    HOOK.call_once(|| {
        // SAFETY: `run_at_exit` is a plain `extern "C"` function that never unwinds.
        let rc = unsafe { libc::atexit(run_at_exit) };
        if rc == 0 {
            INSTALLED_HOOKS.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("Installed exit cleanup hook");
        } else {
            tracing::error!(rc, "Unable to install exit cleanup hook");
        }
    });
}

/// Returns the number of exit callbacks installed by this process; never more than one.
pub fn installed_hooks() -> usize {
    INSTALLED_HOOKS.load(Ordering::SeqCst)
}

#[cfg(test)]
pub(crate) fn enrolled(registry: &Arc<Registry>) -> usize {
    ENROLLED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .filter(|r| Arc::ptr_eq(r, registry))
        .count()
}

extern "C" fn run_at_exit() {
    // Panicking across the FFI boundary would abort; swallow instead.
    let _ = std::panic::catch_unwind(|| {
        let registries = std::mem::take(&mut *ENROLLED.lock().unwrap_or_else(PoisonError::into_inner));
        for registry in registries {
            match cleanup::cleanup_sync(&registry) {
                Ok(report) => tracing::debug!(?report, "Removed temporary resources at exit"),
                Err(Error::NotTracking) => {}
                Err(e) => tracing::error!(error = %e, "Temporary resource cleanup at exit failed"),
            }
        }
    });
}
