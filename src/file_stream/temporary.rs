//! Uniquely named scratch files with guaranteed teardown.

use super::platform::{PlatformBackend, TempFileBackend};
use super::TempFileOptions;
use crate::error::{describe, OrAbort, Result};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};

/// Fixed part of every temp file name, followed by a unique suffix
pub const TEMP_PREFIX: &str = "marian.";

/// A scratch file that lives exactly as long as this value.
///
/// With early unlink the name is removed from its directory right after
/// creation, so only the open descriptor keeps the storage alive. Otherwise
/// the name stays visible and is removed on drop. Failing to remove or close
/// the file on drop aborts the process.
pub struct TemporaryFile {
    file: ManuallyDrop<File>,
    early_unlink: bool,
    name: PathBuf,
}

impl TemporaryFile {
    /// Create a temp file under `base`, aborting on failure.
    ///
    /// `base` is a directory (with or without trailing separator) or a name
    /// prefix such as `/tmp/run1-`.
    #[track_caller]
    pub fn new(base: impl AsRef<Path>, early_unlink: bool) -> Self {
        Self::try_new(base, early_unlink).or_abort()
    }

    #[track_caller]
    pub fn from_options(options: &TempFileOptions) -> Self {
        Self::new(&options.base, options.early_unlink)
    }

    pub fn try_new(base: impl AsRef<Path>, early_unlink: bool) -> Result<Self> {
        let base = PlatformBackend::normalize_base(base.as_ref());
        let (file, name) = PlatformBackend::create(&base, TEMP_PREFIX, early_unlink)?;
        crate::log_at!(
            debug,
            "[io] Created temporary file '{}' (early unlink: {})",
            name.display(),
            early_unlink
        );
        Ok(Self {
            file: ManuallyDrop::new(file),
            early_unlink,
            name,
        })
    }

    /// The open descriptor, valid until this value is dropped
    pub fn file_descriptor(&self) -> &File {
        &self.file
    }

    /// Resolved path, kept for diagnostics even after early unlink
    pub fn file_name(&self) -> &Path {
        &self.name
    }

    pub fn is_early_unlink(&self) -> bool {
        self.early_unlink
    }

    /// Move the descriptor back to the start of the file
    pub fn rewind(&self) -> io::Result<()> {
        (&*self.file).seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// Release the file now instead of at scope end.
    pub fn close(self) {
        drop(self);
    }
}

impl Default for TemporaryFile {
    #[track_caller]
    fn default() -> Self {
        Self::from_options(&TempFileOptions::default())
    }
}

impl Drop for TemporaryFile {
    fn drop(&mut self) {
        // SAFETY: `file` is never touched again after this point.
        let file = unsafe { ManuallyDrop::take(&mut self.file) };
        if let Err(err) = PlatformBackend::release(file, &self.name, self.early_unlink) {
            crate::abort!("{}", describe(&err));
        }
    }
}

impl fmt::Debug for TemporaryFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryFile")
            .field("name", &self.name)
            .field("early_unlink", &self.early_unlink)
            .finish()
    }
}

impl Read for TemporaryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&*self.file).read(buf)
    }
}

impl Write for TemporaryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self.file).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&*self.file).flush()
    }
}

impl Seek for TemporaryFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        (&*self.file).seek(pos)
    }
}

#[cfg(unix)]
impl std::os::fd::AsRawFd for TemporaryFile {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        self.file.as_raw_fd()
    }
}

#[cfg(unix)]
impl std::os::fd::AsFd for TemporaryFile {
    fn as_fd(&self) -> std::os::fd::BorrowedFd<'_> {
        self.file.as_fd()
    }
}

#[cfg(windows)]
impl std::os::windows::io::AsRawHandle for TemporaryFile {
    fn as_raw_handle(&self) -> std::os::windows::io::RawHandle {
        self.file.as_raw_handle()
    }
}
