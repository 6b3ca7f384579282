use crate::exit_hook;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The kind of a tracked resource, which determines how it is deleted.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub(crate) enum Kind {
    File,
    Dir,
}

/// Everything the registry tracks, guarded by a single lock.
#[derive(Debug, Default)]
struct RegistryState {
    /// Whether created resources are remembered for cleanup.
    tracking: bool,

    /// Whether this registry has enrolled with the exit hook.
    exit_hook_installed: bool,

    /// Files awaiting deletion, in registration order.
    files: VecDeque<PathBuf>,

    /// Directories awaiting recursive deletion, in registration order.
    dirs: VecDeque<PathBuf>,
}

/// The pending-deletion queues of one [`Temp`](crate::Temp) instance.
///
/// Queues are drained destructively; every pop happens under the lock so
/// that concurrent drains split the work rather than deleting twice.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    state: Mutex<RegistryState>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tracking(&self, enabled: bool) {
        self.lock().tracking = enabled;
    }

    pub fn is_tracking(&self) -> bool {
        self.lock().tracking
    }

    /// Registers a file for deletion. Returns `false` if tracking is disabled.
    pub fn register_file(self: &Arc<Self>, path: &Path) -> bool {
        self.register(path, Kind::File)
    }

    /// Registers a directory for recursive deletion. Returns `false` if tracking is disabled.
    pub fn register_dir(self: &Arc<Self>, path: &Path) -> bool {
        self.register(path, Kind::Dir)
    }

    fn register(self: &Arc<Self>, path: &Path, kind: Kind) -> bool {
        let enroll = {
            let mut state = self.lock();
            if !state.tracking {
                return false;
            }
            match kind {
                Kind::File => state.files.push_back(path.to_path_buf()),
                Kind::Dir => state.dirs.push_back(path.to_path_buf()),
            }
            !std::mem::replace(&mut state.exit_hook_installed, true)
        };

        // The registry lock is released before taking the exit hook's lock.
        if enroll {
            exit_hook::ensure_installed(Arc::clone(self));
        }

        tracing::debug!(path = %path.display(), ?kind, "Tracking temporary resource");
        true
    }

    pub fn pop(&self, kind: Kind) -> Option<PathBuf> {
        let mut state = self.lock();
        match kind {
            Kind::File => state.files.pop_front(),
            Kind::Dir => state.dirs.pop_front(),
        }
    }

    /// Empties the queue of the given kind, returning its entries in order.
    pub fn take(&self, kind: Kind) -> Vec<PathBuf> {
        let mut state = self.lock();
        match kind {
            Kind::File => state.files.drain(..).collect(),
            Kind::Dir => state.dirs.drain(..).collect(),
        }
    }

    pub fn pending(&self, kind: Kind) -> usize {
        let state = self.lock();
        match kind {
            Kind::File => state.files.len(),
            Kind::Dir => state.dirs.len(),
        }
    }

    /// Returns `true` if neither queue holds a path.
    pub fn is_drained(&self) -> bool {
        let state = self.lock();
        state.files.is_empty() && state.dirs.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untracked_registration_is_a_noop() {
        let registry = Arc::new(Registry::new());
        assert!(!registry.register_file(Path::new("/tmp/a")));
        assert!(!registry.register_dir(Path::new("/tmp/b")));
        assert_eq!(registry.pending(Kind::File), 0);
        assert_eq!(registry.pending(Kind::Dir), 0);
    }

    #[test]
    fn test_queues_are_fifo_and_not_deduplicated() {
        let registry = Arc::new(Registry::new());
        registry.set_tracking(true);
        assert!(registry.register_file(Path::new("/tmp/a")));
        assert!(registry.register_file(Path::new("/tmp/b")));
        assert!(registry.register_file(Path::new("/tmp/a")));
        assert!(registry.register_dir(Path::new("/tmp/d")));

        assert_eq!(registry.pop(Kind::File), Some(PathBuf::from("/tmp/a")));
        assert_eq!(
            registry.take(Kind::File),
            vec![PathBuf::from("/tmp/b"), PathBuf::from("/tmp/a")]
        );
        assert_eq!(registry.pop(Kind::File), None);
        assert_eq!(registry.pending(Kind::Dir), 1);
    }

    #[test]
    fn test_enrolls_with_exit_hook_once() {
        let registry = Arc::new(Registry::new());
        registry.set_tracking(true);
        for i in 0..5 {
            registry.register_file(&PathBuf::from(format!("/tmp/f{i}")));
            registry.register_dir(&PathBuf::from(format!("/tmp/d{i}")));
        }
        assert!(registry.lock().exit_hook_installed);
        assert_eq!(exit_hook::installed_hooks(), 1);
        assert_eq!(exit_hook::enrolled(&registry), 1);

        // Nothing here exists; leave nothing for the exit hook to trip over.
        registry.take(Kind::File);
        registry.take(Kind::Dir);
    }
}
