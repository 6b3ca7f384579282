//! Process-wide settings.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Environment variables consulted for the default temporary directory, in priority order.
pub const TEMP_DIR_VARS: [&str; 3] = ["TMPDIR", "TMP", "TEMP"];

static DEFAULT_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Gets the default temporary directory.
///
/// Resolved once per process from [`TEMP_DIR_VARS`], falling back to the
/// platform default, and canonicalized to an absolute, symlink-free path.
pub fn default_dir() -> &'static PathBuf {
    DEFAULT_DIR.get_or_init(|| resolve_dir(|name| std::env::var_os(name)))
}

/// Resolves the temporary directory using `lookup` to read the environment.
pub(crate) fn resolve_dir<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<OsString>,
{
    let raw = TEMP_DIR_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(platform_dir);

    match std::fs::canonicalize(&raw) {
        Ok(dir) => dir,
        Err(e) => {
            tracing::debug!(dir = %raw.display(), error = %e, "Unable to canonicalize temporary directory");
            raw
        }
    }
}

#[cfg(unix)]
fn platform_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

#[cfg(not(unix))]
fn platform_dir() -> PathBuf {
    std::env::temp_dir()
}
