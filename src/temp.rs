use crate::cleanup::{self, CleanupReport, Counts};
use crate::registry::{Kind, Registry};
use crate::{config, random_name, Affixes, Error};
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

static GLOBAL: OnceLock<Temp> = OnceLock::new();

/// Creates temporary resources and, when tracking is enabled, remembers them
/// so they can be removed on demand or when the process exits.
///
/// Clones share the same tracked resources and default directory.
///
/// Every instance that tracks something stays enrolled with the exit hook
/// until it is dropped with nothing left to delete. Long-lived processes that
/// would otherwise create an instance per job should share [`Temp::global`].
#[derive(Clone)]
pub struct Temp {
    /// The pending deletions of this instance.
    pub(crate) registry: Arc<Registry>,

    /// The directory used when the affixes do not name one.
    dir: Arc<RwLock<PathBuf>>,
}

impl Temp {
    /// Creates an instance rooted in the default temporary directory,
    /// with tracking disabled.
    pub fn new() -> Self {
        Self::with_dir(config::default_dir())
    }

    /// Creates an instance rooted in `dir`, with tracking disabled.
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            dir: Arc::new(RwLock::new(dir.as_ref().to_path_buf())),
        }
    }

    /// Returns the process-wide instance, creating it on first use.
    pub fn global() -> &'static Temp {
        GLOBAL.get_or_init(Temp::new)
    }

    /// Enables or disables tracking. Returns `self` for chaining.
    ///
    /// ## Example
    ///
    /// ```
    /// # use tracked_temp::Temp;
    /// let temp = Temp::new();
    /// assert!(temp.track(true).is_tracking());
    /// ```
    pub fn track(&self, enabled: bool) -> &Self {
        self.registry.set_tracking(enabled);
        self
    }

    pub fn is_tracking(&self) -> bool {
        self.registry.is_tracking()
    }

    /// Gets the directory used when the affixes do not name one.
    pub fn dir(&self) -> PathBuf {
        self.dir.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replaces the directory used when the affixes do not name one.
    pub fn set_dir<P: AsRef<Path>>(&self, dir: P) -> &Self {
        *self.dir.write().unwrap_or_else(PoisonError::into_inner) = dir.as_ref().to_path_buf();
        self
    }

    /// Generates a fresh path without creating anything.
    ///
    /// ## Arguments
    ///
    /// * `affixes` - A prefix string or an [`Affixes`] declaration.
    /// * `default_prefix` - The prefix used when the affixes do not name one.
    ///
    /// ## Example
    ///
    /// ```
    /// # use tracked_temp::{Affixes, Temp};
    /// let temp = Temp::new();
    /// let path = temp.path(Affixes::default().suffix(".json"), Some("cfg-"));
    ///
    /// assert_eq!(path.parent(), Some(temp.dir().as_path()));
    /// assert!(path.to_string_lossy().ends_with(".json"));
    /// assert!(!path.exists());
    /// ```
    pub fn path<A: Into<Affixes>>(&self, affixes: A, default_prefix: Option<&str>) -> PathBuf {
        self.generate_path(&affixes.into(), default_prefix.unwrap_or(""))
    }

    pub(crate) fn generate_path(&self, affixes: &Affixes, default_prefix: &str) -> PathBuf {
        random_name::generate(affixes, default_prefix, &self.dir())
    }

    /// Tracks an existing file for deletion. Returns `false` if tracking is disabled.
    pub fn register_file<P: AsRef<Path>>(&self, path: P) -> bool {
        self.registry.register_file(path.as_ref())
    }

    /// Tracks an existing directory for recursive deletion. Returns `false` if tracking is disabled.
    pub fn register_dir<P: AsRef<Path>>(&self, path: P) -> bool {
        self.registry.register_dir(path.as_ref())
    }

    /// Returns the number of files awaiting deletion.
    pub fn pending_files(&self) -> usize {
        self.registry.pending(Kind::File)
    }

    /// Returns the number of directories awaiting deletion.
    pub fn pending_dirs(&self) -> usize {
        self.registry.pending(Kind::Dir)
    }

    /// Removes all tracked files, then all tracked directories.
    ///
    /// Files that cannot be removed are counted as missing. The first
    /// directory that cannot be removed for a reason other than being
    /// missing aborts the pass; directories after it stay tracked.
    ///
    /// ## Example
    ///
    /// ```
    /// # use tracked_temp::{Error, Temp};
    /// let temp = Temp::new();
    /// assert!(matches!(temp.cleanup_sync(), Err(Error::NotTracking)));
    ///
    /// temp.track(true);
    /// let dir = temp.mkdir_sync("example-")?;
    /// std::fs::write(dir.join("data"), b"content")?;
    ///
    /// let report = temp.cleanup_sync()?;
    /// assert_eq!(report.dirs.removed, 1);
    /// assert!(!dir.exists());
    /// # Ok::<(), Error>(())
    /// ```
    pub fn cleanup_sync(&self) -> Result<CleanupReport, Error> {
        cleanup::cleanup_sync(&self.registry)
    }

    /// Removes all tracked files, then all tracked directories, without blocking.
    ///
    /// Stops at the first removal that fails for a reason other than the
    /// path being missing; the directory pass is skipped if the file pass failed.
    pub async fn cleanup(&self) -> Result<CleanupReport, Error> {
        cleanup::cleanup(&self.registry).await
    }

    /// Removes all tracked files. Failures are counted as missing.
    pub fn cleanup_files_sync(&self) -> Result<Counts, Error> {
        cleanup::drain_files_sync(&self.registry)
    }

    /// Removes all tracked directories recursively.
    pub fn cleanup_dirs_sync(&self) -> Result<Counts, Error> {
        cleanup::drain_dirs_sync(&self.registry)
    }

    /// Removes all tracked files concurrently.
    pub async fn cleanup_files(&self) -> Result<Counts, Error> {
        cleanup::drain_files(&self.registry).await
    }

    /// Removes all tracked directories concurrently.
    pub async fn cleanup_dirs(&self) -> Result<Counts, Error> {
        cleanup::drain_dirs(&self.registry).await
    }
}

impl Default for Temp {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Temp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Temp")
            .field("dir", &self.dir())
            .field("tracking", &self.is_tracking())
            .field("pending_files", &self.pending_files())
            .field("pending_dirs", &self.pending_dirs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_untracked() {
        let temp = Temp::new();
        assert!(!temp.is_tracking());
        assert_eq!(&temp.dir(), config::default_dir());
        assert!(!temp.register_file("/tmp/whatever"));
        assert_eq!(temp.pending_files(), 0);
    }

    #[test]
    fn test_track_is_chainable_and_shared_by_clones() {
        let temp = Temp::new();
        let clone = temp.clone();
        assert!(temp.track(true).track(false).track(true).is_tracking());
        assert!(clone.is_tracking());
    }

    #[test]
    fn test_path_without_default_prefix() {
        let temp = Temp::with_dir("/base");
        let path = temp.path(Affixes::default(), None);
        let name = path.file_name().and_then(|n| n.to_str()).unwrap();
        assert_eq!(path.parent(), Some(Path::new("/base")));
        assert!(name.starts_with(|c: char| c.is_ascii_digit()));
    }

    #[test]
    fn test_set_dir() {
        let temp = Temp::new();
        temp.set_dir("/other");
        assert_eq!(temp.path("x-", None).parent(), Some(Path::new("/other")));
        let path = temp.path(Affixes::from("x-").dir("/explicit"), None);
        assert_eq!(path.parent(), Some(Path::new("/explicit")));
    }

    #[test]
    fn test_global_is_shared() {
        assert!(std::ptr::eq(Temp::global(), Temp::global()));
    }
}
