use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The affix declaration was neither a prefix string nor an affix object.
    #[error("Unknown affix declaration: {0}")]
    InvalidAffixSpec(String),
    /// Cleanup was requested while tracking is disabled.
    #[error("not tracking")]
    NotTracking,
    /// The generated path already existed when it was created exclusively.
    #[error("The generated path {} already exists", .0.display())]
    PathCollision(PathBuf),
    /// A tracked path could not be removed for a reason other than being missing.
    #[error("Failed to remove {}: {source}", path.display())]
    Deletion {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Maps a failed exclusive create onto [`Error::PathCollision`].
    pub(crate) fn from_create(path: PathBuf, e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            Self::PathCollision(path)
        } else {
            Self::Io(e)
        }
    }
}
