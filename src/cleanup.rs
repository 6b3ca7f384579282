//! Draining the pending-deletion queues.
//!
//! Files are removed with `remove_file`, directories recursively with
//! `remove_dir_all`. A path that no longer exists is counted as missing.
//! Other failures are handled per drain:
//!
//! | drain           | on failure                                       |
//! |-----------------|--------------------------------------------------|
//! | files, sync     | logged and counted as missing                    |
//! | dirs, sync      | aborts; the remaining directories stay queued    |
//! | files/dirs, async | aborts counting; started removals still finish |

use crate::registry::{Kind, Registry};
use crate::Error;
use std::io;
use std::path::PathBuf;
use tokio::task::JoinSet;

/// Outcome counts of one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Entries that were deleted by the drain.
    pub removed: usize,
    /// Entries that were already gone (or, for synchronous file drains, could not be deleted).
    pub missing: usize,
}

/// Outcome counts of a full cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub files: Counts,
    pub dirs: Counts,
}

/// The outcome of a single deletion attempt that did not fail.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
enum Removal {
    Removed,
    Missing,
}

impl Removal {
    fn classify(result: io::Result<()>) -> io::Result<Self> {
        match result {
            Ok(()) => Ok(Self::Removed),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::Missing),
            Err(e) => Err(e),
        }
    }
}

impl Counts {
    fn record(&mut self, removal: Removal) {
        match removal {
            Removal::Removed => self.removed += 1,
            Removal::Missing => self.missing += 1,
        }
    }
}

fn ensure_tracking(registry: &Registry) -> Result<(), Error> {
    if registry.is_tracking() {
        Ok(())
    } else {
        Err(Error::NotTracking)
    }
}

pub(crate) fn drain_files_sync(registry: &Registry) -> Result<Counts, Error> {
    ensure_tracking(registry)?;
    let mut counts = Counts::default();
    while let Some(path) = registry.pop(Kind::File) {
        match Removal::classify(std::fs::remove_file(&path)) {
            Ok(removal) => {
                tracing::trace!(path = %path.display(), ?removal, "Drained temporary file");
                counts.record(removal);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unable to remove temporary file");
                counts.record(Removal::Missing);
            }
        }
    }
    Ok(counts)
}

pub(crate) fn drain_dirs_sync(registry: &Registry) -> Result<Counts, Error> {
    ensure_tracking(registry)?;
    let mut counts = Counts::default();
    while let Some(path) = registry.pop(Kind::Dir) {
        let removal = Removal::classify(std::fs::remove_dir_all(&path))
            .map_err(|source| Error::Deletion { path: path.clone(), source })?;
        tracing::trace!(path = %path.display(), ?removal, "Drained temporary directory");
        counts.record(removal);
    }
    Ok(counts)
}

pub(crate) async fn drain_files(registry: &Registry) -> Result<Counts, Error> {
    ensure_tracking(registry)?;
    let mut tasks = JoinSet::new();
    for path in registry.take(Kind::File) {
        tasks.spawn(async move {
            let result = tokio::fs::remove_file(&path).await;
            (path, result)
        });
    }
    collect(tasks).await
}

pub(crate) async fn drain_dirs(registry: &Registry) -> Result<Counts, Error> {
    ensure_tracking(registry)?;
    let mut tasks = JoinSet::new();
    for path in registry.take(Kind::Dir) {
        tasks.spawn(async move {
            let result = tokio::fs::remove_dir_all(&path).await;
            (path, result)
        });
    }
    collect(tasks).await
}

/// Tallies removals as they complete, in whatever order that is.
/// On the first failure the remaining removals are detached, not cancelled.
async fn collect(mut tasks: JoinSet<(PathBuf, io::Result<()>)>) -> Result<Counts, Error> {
    let mut counts = Counts::default();
    while let Some(joined) = tasks.join_next().await {
        let (path, result) = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                tasks.detach_all();
                return Err(Error::Io(io::Error::other(e)));
            }
        };

        match Removal::classify(result) {
            Ok(removal) => {
                tracing::trace!(path = %path.display(), ?removal, "Drained temporary resource");
                counts.record(removal);
            }
            Err(source) => {
                tasks.detach_all();
                return Err(Error::Deletion { path, source });
            }
        }
    }
    Ok(counts)
}

pub(crate) fn cleanup_sync(registry: &Registry) -> Result<CleanupReport, Error> {
    let files = drain_files_sync(registry)?;
    let dirs = drain_dirs_sync(registry)?;
    Ok(CleanupReport { files, dirs })
}

pub(crate) async fn cleanup(registry: &Registry) -> Result<CleanupReport, Error> {
    let files = drain_files(registry).await?;
    let dirs = drain_dirs(registry).await?;
    Ok(CleanupReport { files, dirs })
}
