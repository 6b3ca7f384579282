use crate::{Affixes, Error, Temp};
use std::io;
use std::path::{Path, PathBuf};

const DIR_PREFIX: &str = "d-";
const DIR_MODE: u32 = 0o700;

impl Temp {
    /// Creates a new temporary directory and tracks it for recursive deletion.
    ///
    /// ## Arguments
    ///
    /// * `affixes` - A prefix string or an [`Affixes`] declaration. The default
    ///   prefix is `d-` and the default mode `0o700`.
    ///
    /// ## Example
    ///
    /// ```
    /// # use tracked_temp::{Affixes, Error, Temp};
    /// let temp = Temp::new();
    /// temp.track(true);
    ///
    /// let dir = temp.mkdir_sync(Affixes::from("build-").mode(0o750))?;
    /// assert!(dir.is_dir());
    /// assert_eq!(temp.pending_dirs(), 1);
    /// # temp.cleanup_sync()?;
    /// # Ok::<(), Error>(())
    /// ```
    pub fn mkdir_sync<A: Into<Affixes>>(&self, affixes: A) -> Result<PathBuf, Error> {
        let affixes = affixes.into();
        let path = self.generate_path(&affixes, DIR_PREFIX);
        let mode = affixes.resolve_mode(DIR_MODE);

        create_dir_sync(&path, mode).map_err(|e| Error::from_create(path.clone(), e))?;
        #[cfg(unix)]
        if let Err(e) = set_mode_sync(&path, mode) {
            tracing::warn!(path = %path.display(), error = %e, "Unable to set directory mode");
        }

        self.registry.register_dir(&path);
        tracing::debug!(path = %path.display(), mode = %format!("{:o}", mode), "Created temporary directory");
        Ok(path)
    }

    /// Creates a new temporary directory and tracks it for recursive deletion.
    ///
    /// See [`Temp::mkdir_sync`] for the arguments.
    ///
    /// ## Example
    ///
    /// ```
    /// # use tracked_temp::{Error, Temp};
    /// # use tokio::fs;
    /// # let _ = tokio_test::block_on(async {
    /// let temp = Temp::new();
    /// temp.track(true);
    ///
    /// let dir = temp.mkdir("foo").await?;
    /// fs::write(dir.join("a file"), "a content").await?;
    ///
    /// temp.cleanup().await?;
    /// assert!(fs::metadata(dir).await.is_err());
    /// # Ok::<(), Error>(())
    /// # });
    /// ```
    pub async fn mkdir<A: Into<Affixes>>(&self, affixes: A) -> Result<PathBuf, Error> {
        let affixes = affixes.into();
        let path = self.generate_path(&affixes, DIR_PREFIX);
        let mode = affixes.resolve_mode(DIR_MODE);

        create_dir(&path, mode)
            .await
            .map_err(|e| Error::from_create(path.clone(), e))?;
        #[cfg(unix)]
        if let Err(e) = set_mode(&path, mode).await {
            tracing::warn!(path = %path.display(), error = %e, "Unable to set directory mode");
        }

        self.registry.register_dir(&path);
        tracing::debug!(path = %path.display(), mode = %format!("{:o}", mode), "Created temporary directory");
        Ok(path)
    }
}

#[cfg_attr(not(unix), allow(unused_variables))]
fn create_dir_sync(path: &Path, mode: u32) -> io::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    builder.create(path)
}

#[cfg_attr(not(unix), allow(unused_variables))]
async fn create_dir(path: &Path, mode: u32) -> io::Result<()> {
    let mut builder = tokio::fs::DirBuilder::new();
    #[cfg(unix)]
    builder.mode(mode);
    builder.create(path).await
}

/// Applies `mode` exactly; the mode given at creation is masked by the umask.
#[cfg(unix)]
fn set_mode_sync(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}
