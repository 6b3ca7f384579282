use crate::{Affixes, Error, Temp};
use std::borrow::{Borrow, BorrowMut};
use std::fmt::{Debug, Formatter};
use std::io::IoSlice;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio::io::AsyncWrite;

const FILE_PREFIX: &str = "f-";
const STREAM_PREFIX: &str = "s-";
const FILE_MODE: u32 = 0o600;

/// A newly created temporary file together with its open read-write handle.
///
/// `F` is [`std::fs::File`] for [`Temp::open_sync`] and [`tokio::fs::File`]
/// for [`Temp::open`]. Dropping the handle closes the file but does not delete
/// it; deletion is left to the tracking registry.
pub struct OpenFile<F> {
    path: PathBuf,
    file: F,
}

impl<F> OpenFile<F> {
    /// Returns the path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Splits into the path and the open handle.
    pub fn into_parts(self) -> (PathBuf, F) {
        (self.path, self.file)
    }
}

impl<F> Debug for OpenFile<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.path)
    }
}

/// Allows implicit treatment of OpenFile as its file handle.
impl<F> Deref for OpenFile<F> {
    type Target = F;

    fn deref(&self) -> &Self::Target {
        &self.file
    }
}

impl<F> DerefMut for OpenFile<F> {
    fn deref_mut(&mut self) -> &mut F {
        &mut self.file
    }
}

/// A writable stream over a newly created temporary file.
pub struct WriteStream {
    path: PathBuf,
    file: File,
}

impl WriteStream {
    /// Returns the path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Temp {
    /// Creates and opens a new temporary file, tracking it for deletion.
    ///
    /// The file is created exclusively; if the generated name already exists,
    /// [`Error::PathCollision`] is returned and nothing is tracked.
    ///
    /// ## Arguments
    ///
    /// * `affixes` - A prefix string or an [`Affixes`] declaration. The default
    ///   prefix is `f-` and the default mode `0o600`.
    ///
    /// ## Example
    ///
    /// ```
    /// # use std::io::Write;
    /// # use tracked_temp::{Error, Temp};
    /// let temp = Temp::new();
    /// temp.track(true);
    ///
    /// let mut file = temp.open_sync("bar")?;
    /// file.write_all(b"foo")?;
    /// assert!(file.path().is_file());
    ///
    /// let path = file.path().to_path_buf();
    /// drop(file);
    /// temp.cleanup_sync()?;
    /// assert!(!path.exists());
    /// # Ok::<(), Error>(())
    /// ```
    pub fn open_sync<A: Into<Affixes>>(&self, affixes: A) -> Result<OpenFile<std::fs::File>, Error> {
        let affixes = affixes.into();
        let path = self.generate_path(&affixes, FILE_PREFIX);
        let mode = affixes.resolve_mode(FILE_MODE);

        let mut options = std::fs::OpenOptions::new();
        options.read(true).write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        let file = options
            .open(&path)
            .map_err(|e| Error::from_create(path.clone(), e))?;

        self.track_file(&path, mode);
        Ok(OpenFile { path, file })
    }

    /// Creates and opens a new temporary file, tracking it for deletion.
    ///
    /// See [`Temp::open_sync`] for the arguments.
    ///
    /// ## Example
    ///
    /// ```
    /// # use tracked_temp::{Error, Temp};
    /// # use tokio::io::AsyncWriteExt;
    /// # let _ = tokio_test::block_on(async {
    /// let temp = Temp::new();
    /// temp.track(true);
    ///
    /// let mut file = temp.open(()).await?;
    /// file.write_all(b"foo").await?;
    ///
    /// let report = temp.cleanup().await?;
    /// assert_eq!(report.files.removed, 1);
    /// # Ok::<(), Error>(())
    /// # });
    /// ```
    pub async fn open<A: Into<Affixes>>(&self, affixes: A) -> Result<OpenFile<File>, Error> {
        let affixes = affixes.into();
        let path = self.generate_path(&affixes, FILE_PREFIX);
        let mode = affixes.resolve_mode(FILE_MODE);
        let file = open_exclusive(&path, mode).await?;

        self.track_file(&path, mode);
        Ok(OpenFile { path, file })
    }

    /// Creates a new temporary file and returns a writable stream to it,
    /// tracking the file for deletion.
    ///
    /// ## Arguments
    ///
    /// * `affixes` - A prefix string or an [`Affixes`] declaration. The default
    ///   prefix is `s-` and the default mode `0o600`.
    ///
    /// ## Example
    ///
    /// ```
    /// # use tracked_temp::{Error, Temp};
    /// # use tokio::io::AsyncWriteExt;
    /// # let _ = tokio_test::block_on(async {
    /// let temp = Temp::new();
    /// temp.track(true);
    ///
    /// let mut stream = temp.create_write_stream("baz").await?;
    /// stream.write_all(b"More text here\nand more...").await?;
    /// stream.shutdown().await?;
    ///
    /// let contents = tokio::fs::read_to_string(stream.path()).await?;
    /// assert_eq!(contents, "More text here\nand more...");
    /// # temp.cleanup().await?;
    /// # Ok::<(), Error>(())
    /// # });
    /// ```
    pub async fn create_write_stream<A: Into<Affixes>>(&self, affixes: A) -> Result<WriteStream, Error> {
        let affixes = affixes.into();
        let path = self.generate_path(&affixes, STREAM_PREFIX);
        let mode = affixes.resolve_mode(FILE_MODE);
        let file = open_exclusive(&path, mode).await?;

        self.track_file(&path, mode);
        Ok(WriteStream { path, file })
    }

    fn track_file(&self, path: &Path, mode: u32) {
        self.registry.register_file(path);
        tracing::debug!(path = %path.display(), mode = %format!("{:o}", mode), "Created temporary file");
    }
}

#[cfg_attr(not(unix), allow(unused_variables))]
async fn open_exclusive(path: &Path, mode: u32) -> Result<File, Error> {
    let mut options = tokio::fs::OpenOptions::new();
    options.read(true).write(true).create_new(true);
    #[cfg(unix)]
    options.mode(mode);
    options
        .open(path)
        .await
        .map_err(|e| Error::from_create(path.to_path_buf(), e))
}

impl Debug for WriteStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.path)
    }
}

/// Allows implicit treatment of WriteStream as a File.
impl Deref for WriteStream {
    type Target = File;

    fn deref(&self) -> &Self::Target {
        &self.file
    }
}

/// Allows implicit treatment of WriteStream as a mutable File.
impl DerefMut for WriteStream {
    fn deref_mut(&mut self) -> &mut File {
        &mut self.file
    }
}

impl Borrow<File> for WriteStream {
    fn borrow(&self) -> &File {
        &self.file
    }
}

impl BorrowMut<File> for WriteStream {
    fn borrow_mut(&mut self) -> &mut File {
        &mut self.file
    }
}

/// Forwarding AsyncWrite to the embedded File
impl AsyncWrite for WriteStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, std::io::Error>> {
        Pin::new(&mut self.file).poll_write(cx, buf)
    }

    fn poll_flush(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        Pin::new(&mut self.file).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        Pin::new(&mut self.file).poll_shutdown(cx)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[IoSlice<'_>],
    ) -> Poll<Result<usize, std::io::Error>> {
        Pin::new(&mut self.file).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.file.is_write_vectored()
    }
}
